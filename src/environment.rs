use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::directory::Directory;
use crate::notify::Notifier;
use crate::urls::Urls;

pub type SafeDb = dyn Db + Send + Sync;
pub type SafeDirectory = dyn Directory + Send + Sync;
pub type SafeNotifier = dyn Notifier + Send + Sync;

/// Everything a request handler needs, cheap to clone.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<SafeDb>,
    pub directory: Arc<SafeDirectory>,
    pub notifier: Arc<SafeNotifier>,
    pub urls: Arc<Urls>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<SafeDb>,
        directory: Arc<SafeDirectory>,
        notifier: Arc<SafeNotifier>,
        urls: Arc<Urls>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            db,
            directory,
            notifier,
            urls,
            config,
        }
    }
}

/// Horizon policy, in days past today. Administrators are always
/// unbounded and not represented here.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub(crate) volunteer_horizon_days: u16,
    pub(crate) responsible_horizon_days: u16,
}

impl Config {
    pub fn new(volunteer_horizon_days: u16, responsible_horizon_days: u16) -> Self {
        Self {
            volunteer_horizon_days,
            responsible_horizon_days,
        }
    }
}
