mod mock_gateway;
mod prepare_env;
mod webhooks;

pub use mock_gateway::{GatewayBehaviour, MockGateway};
pub use prepare_env::{create_database, prepare_test_env, random_db_path};
pub use webhooks::{sign_client_callback, sign_webhook, webhook_body, TEST_API_SECRET, TEST_WEBHOOK_SECRET};
