//! Identity resolution
//!
//! Decides which uid/gid the extraction tools and the database engine run
//! under. A privileged controlling process must name an unprivileged
//! account explicitly; an unprivileged one runs everything as itself and
//! ignores the requested name.

mod errors;

pub use errors::{IdentityError, IdentityErrorCode, IdentityResult};

use nix::unistd::{Gid, Uid, User, getegid, geteuid};

use crate::observability::{Event, Logger};

/// Effective identity for child processes and workspace ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    privileged: bool,
    uid: u32,
    gid: u32,
}

impl Identity {
    /// Build an identity from raw ids
    pub fn new(privileged: bool, uid: u32, gid: u32) -> Self {
        Self {
            privileged,
            uid,
            gid,
        }
    }

    /// Identity of the controlling process itself
    pub fn current() -> Self {
        let euid = geteuid();
        Self::new(euid.is_root(), euid.as_raw(), getegid().as_raw())
    }

    /// Whether the controlling process runs with elevated privilege
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Target user id
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Target group id
    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn nix_uid(&self) -> Uid {
        Uid::from_raw(self.uid)
    }

    pub fn nix_gid(&self) -> Gid {
        Gid::from_raw(self.gid)
    }
}

/// Resolve the run identity for the controlling process
///
/// # Errors
///
/// - privileged and `requested_user` is `None`
/// - privileged and the named account does not exist
pub fn resolve(requested_user: Option<&str>, logger: &Logger) -> IdentityResult<Identity> {
    resolve_with(Identity::current(), requested_user, logger, |name| {
        User::from_name(name)
            .map(|user| user.map(|u| (u.uid.as_raw(), u.gid.as_raw())))
            .map_err(|e| IdentityError::lookup_failed(name, e))
    })
}

/// Resolve against an explicit controlling identity and account lookup
///
/// `lookup` returns `Ok(None)` when the account does not exist.
pub fn resolve_with<F>(
    controller: Identity,
    requested_user: Option<&str>,
    logger: &Logger,
    lookup: F,
) -> IdentityResult<Identity>
where
    F: FnOnce(&str) -> IdentityResult<Option<(u32, u32)>>,
{
    if !controller.is_privileged() {
        let identity = Identity::new(false, controller.uid(), controller.gid());
        log_resolved(logger, &identity);
        return Ok(identity);
    }

    logger.warn(Event::RunningPrivileged, &[]);

    let name = requested_user.ok_or_else(IdentityError::user_required)?;
    let (uid, gid) = lookup(name)?.ok_or_else(|| IdentityError::unknown_user(name))?;

    let identity = Identity::new(true, uid, gid);
    log_resolved(logger, &identity);
    Ok(identity)
}

fn log_resolved(logger: &Logger, identity: &Identity) {
    logger.info(
        Event::IdentityResolved,
        &[
            ("gid", &identity.gid().to_string()),
            ("privileged", if identity.is_privileged() { "true" } else { "false" }),
            ("uid", &identity.uid().to_string()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_lookup(_: &str) -> IdentityResult<Option<(u32, u32)>> {
        panic!("lookup must not be called");
    }

    #[test]
    fn test_unprivileged_ignores_requested_user() {
        let logger = Logger::capture();
        let controller = Identity::new(false, 1000, 1000);

        let identity = resolve_with(controller, Some("mysql"), &logger, no_lookup).unwrap();

        assert!(!identity.is_privileged());
        assert_eq!(identity.uid(), 1000);
        assert_eq!(identity.gid(), 1000);
    }

    #[test]
    fn test_unprivileged_without_user() {
        let logger = Logger::capture();
        let identity = resolve_with(Identity::new(false, 501, 20), None, &logger, no_lookup).unwrap();
        assert_eq!((identity.uid(), identity.gid()), (501, 20));
    }

    #[test]
    fn test_privileged_requires_user() {
        let logger = Logger::capture();
        let err = resolve_with(Identity::new(true, 0, 0), None, &logger, no_lookup).unwrap_err();
        assert_eq!(err.code(), IdentityErrorCode::B2sIdentityUserRequired);
        assert!(format!("{}", err).contains("--user"));
    }

    #[test]
    fn test_privileged_unknown_user() {
        let logger = Logger::capture();
        let err = resolve_with(Identity::new(true, 0, 0), Some("nobody-here"), &logger, |_| Ok(None))
            .unwrap_err();
        assert_eq!(err.code(), IdentityErrorCode::B2sIdentityUnknownUser);
        assert!(err.message().contains("nobody-here"));
    }

    #[test]
    fn test_privileged_resolves_named_account() {
        let logger = Logger::capture();
        let identity = resolve_with(Identity::new(true, 0, 0), Some("mysql"), &logger, |name| {
            assert_eq!(name, "mysql");
            Ok(Some((27, 27)))
        })
        .unwrap();

        assert!(identity.is_privileged());
        assert_eq!((identity.uid(), identity.gid()), (27, 27));
        assert!(logger.captured()[0].contains("RUNNING_PRIVILEGED"));
    }

    #[test]
    fn test_resolve_current_process() {
        let logger = Logger::capture();
        let current = Identity::current();
        if current.is_privileged() {
            return;
        }
        let identity = resolve(Some("root"), &logger).unwrap();
        assert_eq!(identity, current);
    }
}
