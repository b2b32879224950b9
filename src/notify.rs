//! Outbound notification dispatch. From this subsystem's point of view
//! delivery is fire-and-forget: callers log failures and never roll back
//! the mutation that triggered the notification.

use std::collections::HashMap;

use futures::future::BoxFuture;

use crate::errors::BackendError;

/// The templated messages this subsystem can trigger. Rendering happens
/// in the delivery service; only the template ID and its variables cross
/// the boundary.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Template {
    EnrollmentCreated,
    EnrollmentCancelled,
    SeriesCancelled,
}

impl Template {
    pub fn id(&self) -> &'static str {
        match self {
            Template::EnrollmentCreated => "enrollment-created",
            Template::EnrollmentCancelled => "enrollment-cancelled",
            Template::SeriesCancelled => "series-cancelled",
        }
    }
}

/// One message handed to the delivery service.
#[derive(Clone, Debug)]
pub struct Notification {
    pub recipient: String,
    pub template: Template,
    pub subject: String,
    pub variables: HashMap<&'static str, String>,
}

impl Notification {
    pub fn new(recipient: impl Into<String>, template: Template, subject: impl Into<String>) -> Self {
        Notification {
            recipient: recipient.into(),
            template,
            subject: subject.into(),
            variables: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.variables.insert(name, value.into());
        self
    }
}

pub trait Notifier {
    /// Hands one message to the delivery service.
    fn send(&self, notification: Notification) -> BoxFuture<Result<(), BackendError>>;
}

pub use self::log_notifier::*;

mod log_notifier {
    use std::sync::Arc;

    use futures::future::{BoxFuture, FutureExt};
    use log::{info, Logger};

    use super::{Notification, Notifier};
    use crate::errors::BackendError;

    /// Hands messages to the delivery service by emitting structured log
    /// records the mail relay tails. The relay owns templates, retries
    /// and bounces.
    pub struct LogNotifier {
        logger: Arc<Logger>,
    }

    impl LogNotifier {
        pub fn new(logger: Arc<Logger>) -> Self {
            LogNotifier { logger }
        }
    }

    impl Notifier for LogNotifier {
        fn send(&self, notification: Notification) -> BoxFuture<Result<(), BackendError>> {
            info!(
                self.logger,
                "Dispatching notification";
                "recipient" => &notification.recipient,
                "template" => notification.template.id(),
                "subject" => &notification.subject,
                "variables" => format!("{:?}", notification.variables)
            );

            async move { Ok(()) }.boxed()
        }
    }
}

pub mod mock {
    use std::sync::RwLock;

    use futures::future::{BoxFuture, FutureExt};

    use super::{Notification, Notifier, Template};
    use crate::errors::BackendError;

    /// Records every dispatched notification for assertions.
    #[derive(Default)]
    pub struct MockNotifier {
        pub sent: RwLock<Vec<Notification>>,
    }

    impl MockNotifier {
        pub fn new() -> Self {
            Default::default()
        }

        pub fn sent_to(&self, recipient: &str) -> Vec<Notification> {
            self.sent
                .read()
                .unwrap()
                .iter()
                .filter(|n| n.recipient == recipient)
                .cloned()
                .collect()
        }

        pub fn count(&self, template: Template) -> usize {
            self.sent
                .read()
                .unwrap()
                .iter()
                .filter(|n| n.template == template)
                .count()
        }
    }

    impl Notifier for MockNotifier {
        fn send(&self, notification: Notification) -> BoxFuture<Result<(), BackendError>> {
            self.sent.write().unwrap().push(notification);

            async move { Ok(()) }.boxed()
        }
    }
}
