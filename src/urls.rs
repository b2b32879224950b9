use url::Url;
use uuid::Uuid;

/// Convenience wrapper for URL generation. The links end up in
/// notification variables, so they must match the public site.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path for all action-related routes.
    pub(crate) actions_path: String,

    /// Path for all enrollment-related routes.
    pub(crate) enrollments_path: String,

    /// Path for the calendar routes.
    pub(crate) calendar_path: String,

    /// Prefix for action links.
    actions_prefix: String,
}

impl Urls {
    /// Create a new instance. `actions_prefix` should *not* include a trailing slash.
    pub fn new(base: impl AsRef<str>, actions_prefix: impl Into<String>) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));
        let actions_path = actions_prefix.into();
        let actions_prefix = format!("{}/", actions_path);

        Urls {
            base,
            actions_path,
            enrollments_path: "enrollments".to_owned(),
            calendar_path: "calendar".to_owned(),
            actions_prefix,
        }
    }

    pub fn actions(&self) -> Url {
        self.base
            .join(&self.actions_prefix)
            .expect("get actions URL")
    }

    pub fn action(&self, id: &Uuid) -> Url {
        let id = format!("{}", id);
        self.actions()
            .join(&id)
            .unwrap_or_else(|_| panic!("get URL for action {}", id))
    }
}
