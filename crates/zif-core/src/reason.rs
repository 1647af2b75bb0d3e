//! The `Reason` tag carried by every transaction item and persisted into
//! history rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a package ended up queued for install, update, or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    /// Installed because the user explicitly asked for it.
    InstallUserAction,
    /// Installed to satisfy another package's dependency.
    InstallDepend,
    /// Installed as the new half of an update pair.
    InstallForUpdate,
    /// Removed because the user explicitly asked for it.
    RemoveUserAction,
    /// Removed because it exceeded `installonly_limit`.
    RemoveAsOnlyN,
    /// Removed because a dependent package is being removed.
    RemoveForDep,
    /// Removed as the old half of an update pair.
    RemoveForUpdate,
    /// Removed because another package obsoletes it.
    RemoveObsolete,
    /// Updated because the user explicitly asked for it.
    UpdateUserAction,
    /// Updated by a whole-system update sweep.
    UpdateSystem,
    /// Updated to satisfy a dependency that the installed version can't.
    UpdateDepend,
    /// Updated to resolve a conflict.
    UpdateForConflict,
    /// Downgraded because the user explicitly asked for it.
    DowngradeUserAction,
    /// Downgraded to satisfy a dependency.
    DowngradeForDep,
    /// Downgraded because the currently installed version is invalid.
    DowngradeInstalled,
}

impl Reason {
    /// The exact string persisted into history rows and yumdb entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InstallUserAction => "install-user-action",
            Self::InstallDepend => "install-depend",
            Self::InstallForUpdate => "install-for-update",
            Self::RemoveUserAction => "remove-user-action",
            Self::RemoveAsOnlyN => "remove-as-onlyn",
            Self::RemoveForDep => "remove-for-dep",
            Self::RemoveForUpdate => "remove-for-update",
            Self::RemoveObsolete => "remove-obsolete",
            Self::UpdateUserAction => "update-user-action",
            Self::UpdateSystem => "update-system",
            Self::UpdateDepend => "update-depend",
            Self::UpdateForConflict => "update-for-conflict",
            Self::DowngradeUserAction => "downgrade-user-action",
            Self::DowngradeForDep => "downgrade-for-dep",
            Self::DowngradeInstalled => "downgrade-installed",
        }
    }

    /// Is this one of the three `*-user-action` reasons?
    #[must_use]
    pub const fn is_user_action(self) -> bool {
        matches!(
            self,
            Self::InstallUserAction | Self::RemoveUserAction | Self::UpdateUserAction | Self::DowngradeUserAction
        )
    }

    /// Is this any of the `downgrade-*` reasons?
    #[must_use]
    pub const fn is_downgrade(self) -> bool {
        matches!(
            self,
            Self::DowngradeUserAction | Self::DowngradeForDep | Self::DowngradeInstalled
        )
    }

    /// The yumdb `reason` value the commit phase writes for installs:
    /// collapses the fine-grained tag to `user` or `dep`.
    #[must_use]
    pub const fn yumdb_reason(self) -> &'static str {
        if self.is_user_action() {
            "user"
        } else {
            "dep"
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Reason {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "install-user-action" => Self::InstallUserAction,
            "install-depend" => Self::InstallDepend,
            "install-for-update" => Self::InstallForUpdate,
            "remove-user-action" => Self::RemoveUserAction,
            "remove-as-onlyn" => Self::RemoveAsOnlyN,
            "remove-for-dep" => Self::RemoveForDep,
            "remove-for-update" => Self::RemoveForUpdate,
            "remove-obsolete" => Self::RemoveObsolete,
            "update-user-action" => Self::UpdateUserAction,
            "update-system" => Self::UpdateSystem,
            "update-depend" => Self::UpdateDepend,
            "update-for-conflict" => Self::UpdateForConflict,
            "downgrade-user-action" => Self::DowngradeUserAction,
            "downgrade-for-dep" => Self::DowngradeForDep,
            "downgrade-installed" => Self::DowngradeInstalled,
            other => {
                return Err(crate::error::Error::NotSupported {
                    code: crate::error::ErrorCode::E0103,
                    what: format!("unknown reason tag `{other}`"),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for reason in [
            Reason::InstallUserAction,
            Reason::RemoveForUpdate,
            Reason::DowngradeInstalled,
        ] {
            assert_eq!(reason.as_str().parse::<Reason>().unwrap(), reason);
        }
    }

    #[test]
    fn yumdb_reason_collapses_to_user_or_dep() {
        assert_eq!(Reason::InstallUserAction.yumdb_reason(), "user");
        assert_eq!(Reason::InstallDepend.yumdb_reason(), "dep");
        assert_eq!(Reason::InstallForUpdate.yumdb_reason(), "dep");
    }

    #[test]
    fn unknown_reason_is_rejected() {
        assert!("bogus".parse::<Reason>().is_err());
    }
}
