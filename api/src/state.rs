use std::sync::Arc;

use taskpilot_auth::RequestAuthenticator;

use crate::identity::UserDirectory;
use crate::store::TaskStore;
use crate::weather::WeatherProvider;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserDirectory>,
    pub weather: Arc<dyn WeatherProvider>,
    /// `None` leaves the skillset routes unsigned.
    pub skillset_auth: Option<Arc<RequestAuthenticator>>,
}
