use crate::dto::HealthRes;

/// Simple health service shared by the REST binaries.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Mandal is alive".into(),
        }
    }
}
