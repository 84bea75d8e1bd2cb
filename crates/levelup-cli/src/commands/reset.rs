//! The `levelup reset` command.

use anyhow::Result;

use levelup_core::model::ProgressKey;
use levelup_store::create_gateway;

use super::StoreArgs;

pub async fn execute(quiz_id: String, store: StoreArgs) -> Result<()> {
    let config = store.resolve()?;
    let gateway = create_gateway(&config)?;
    let key = ProgressKey::new(config.user_id.clone(), quiz_id);

    if gateway.reset(&key).await? {
        println!("Removed local progress for {key}.");
    } else {
        println!("No local progress stored for {key}.");
    }
    if !gateway.is_local_only() {
        println!("Remote progress is replaced the next time the quiz is played.");
    }

    Ok(())
}
