use std::sync::Arc;

use crate::status::StatusService;
use crate::subscription_registry::{ConfirmOutcome, SubscribeOutcome, SubscriptionRegistry, UnchangedReason};

pub const START_MESSAGE: &str = "Hello! I'm a bot for tracking Story Protocol validators. 🤖✨\n\n\
    /subscribe <operator_address> - get alerts when the validator changes\n\
    /subscribed - show your subscription\n\
    /check <operator_address> - show a validator's current status\n\
    /checksubbed - show the status of your subscribed validator";
pub const SUBSCRIBE_USAGE: &str = "Usage: /subscribe <operator_address> 📩";
pub const CHECK_USAGE: &str = "Usage: /check <operator_address> 📜";
pub const NOT_SUBSCRIBED: &str = "You are not subscribed to any validator 🚫";
pub const YES_OR_NO: &str = "Please respond with 'yes' or 'no' 🙏";
pub const NOT_CHANGED: &str = "Subscription not changed 🚫";
pub const NOTHING_PENDING: &str = "There is no pending subscription change.";
pub const SUBSCRIBE_ERROR: &str = "An error occurred while subscribing 😞";
pub const UPDATE_ERROR: &str = "An error occurred while updating the subscription ⚠️";
pub const LOOKUP_ERROR: &str = "An error occurred while retrieving the validator address ❌";

/// Maps one inbound message from an observer to the reply, if any, that goes back.
pub struct CommandRouter {
    registry: Arc<SubscriptionRegistry>,
    status: Arc<StatusService>,
}

impl CommandRouter {
    pub fn new(registry: Arc<SubscriptionRegistry>, status: Arc<StatusService>) -> Self {
        Self { registry, status }
    }

    pub async fn handle(&self, observer_id: &str, text: &str) -> Option<String> {
        let text = text.trim();
        let Some(command_line) = text.strip_prefix('/') else {
            return self.handle_reply(observer_id, text).await;
        };

        let mut parts = command_line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        // "/check@story_bot" addresses a specific bot in group chats
        let command = command.split('@').next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let reply = match command {
            "start" => START_MESSAGE.to_string(),
            "subscribe" => match args.as_slice() {
                [address] => self.subscribe(observer_id, address).await,
                _ => SUBSCRIBE_USAGE.to_string(),
            },
            "subscribed" => match self.registry.get_subscription(observer_id).await {
                Ok(Some(address)) => format!("You are subscribed to the validator: {} ✅", address),
                Ok(None) => NOT_SUBSCRIBED.to_string(),
                Err(err) => {
                    log::warn!("subscription lookup for {} failed: {}", observer_id, err);
                    LOOKUP_ERROR.to_string()
                }
            },
            "check" => match args.as_slice() {
                [address] => self.status.check_message(address).await,
                _ => CHECK_USAGE.to_string(),
            },
            "checksubbed" => match self.registry.get_subscription(observer_id).await {
                Ok(Some(address)) => self.status.check_message(&address).await,
                Ok(None) => NOT_SUBSCRIBED.to_string(),
                Err(err) => {
                    log::warn!("subscription lookup for {} failed: {}", observer_id, err);
                    LOOKUP_ERROR.to_string()
                }
            },
            _ => return None,
        };
        Some(reply)
    }

    async fn subscribe(&self, observer_id: &str, address: &str) -> String {
        match self.registry.subscribe(observer_id, address).await {
            Ok(SubscribeOutcome::Created) => {
                format!("You have subscribed to track the validator {} 🎉", address)
            }
            Ok(SubscribeOutcome::AlreadySubscribed) => {
                format!("You are already subscribed to the validator {} ✅", address)
            }
            Ok(SubscribeOutcome::PendingConfirmation { existing_address, .. }) => format!(
                "You are already subscribed to the validator {}. Do you want to overwrite it with {}? (yes/no)",
                existing_address, address
            ),
            Err(err) => {
                log::warn!("subscribe of {} to {} failed: {}", observer_id, address, err);
                SUBSCRIBE_ERROR.to_string()
            }
        }
    }

    /// Plain text only means something while this observer has a question open.
    async fn handle_reply(&self, observer_id: &str, text: &str) -> Option<String> {
        self.registry.pending_request(observer_id).await?;

        let accepted = match text.to_ascii_lowercase().as_str() {
            "yes" | "y" => true,
            "no" | "n" => false,
            _ => return Some(YES_OR_NO.to_string()),
        };

        let reply = match self.registry.respond(observer_id, accepted).await {
            Ok(ConfirmOutcome::Updated { current_address, .. }) => {
                format!("Subscription successfully updated to validator {}. ✅", current_address)
            }
            Ok(ConfirmOutcome::Unchanged(UnchangedReason::Declined)) => NOT_CHANGED.to_string(),
            Ok(ConfirmOutcome::Unchanged(UnchangedReason::NoPendingRequest)) => NOTHING_PENDING.to_string(),
            Err(err) => {
                log::warn!("subscription update for {} failed: {}", observer_id, err);
                UPDATE_ERROR.to_string()
            }
        };
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::source::StaticSource;
    use crate::status::USER_NOT_FOUND;
    use std::time::Duration;
    use validator_watch_datastore::WatchDatastore;

    const X: &str = "storyvaloper1xxx";
    const Y: &str = "storyvaloper1yyy";

    fn router() -> (Arc<SubscriptionRegistry>, CommandRouter) {
        let datastore = Arc::new(WatchDatastore::create_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(0));
        let registry = Arc::new(SubscriptionRegistry::new(datastore, clock, Duration::from_secs(300)));
        let status = Arc::new(StatusService::new(Arc::new(StaticSource::new("[]", "[]")), 100));
        (registry.clone(), CommandRouter::new(registry, status))
    }

    #[tokio::test]
    async fn test_subscribe_flow() {
        let (registry, router) = router();

        let reply = router.handle("1", &format!("/subscribe {}", X)).await.unwrap();
        assert!(reply.contains("You have subscribed"));

        let reply = router.handle("1", &format!("/subscribe@story_bot {}", Y)).await.unwrap();
        assert!(reply.contains("(yes/no)"));
        assert!(reply.contains(X));

        assert_eq!(router.handle("1", "maybe").await.unwrap(), YES_OR_NO);
        let reply = router.handle("1", "YES").await.unwrap();
        assert!(reply.contains(Y));
        assert_eq!(registry.get_subscription("1").await.unwrap(), Some(Y.to_string()));

        let reply = router.handle("1", "/subscribed").await.unwrap();
        assert!(reply.contains(Y));
    }

    #[tokio::test]
    async fn test_declined_overwrite() {
        let (registry, router) = router();
        router.handle("1", &format!("/subscribe {}", X)).await;
        router.handle("1", &format!("/subscribe {}", Y)).await;
        assert_eq!(router.handle("1", "no").await.unwrap(), NOT_CHANGED);
        assert_eq!(registry.get_subscription("1").await.unwrap(), Some(X.to_string()));
        assert_eq!(router.handle("1", "yes").await, None);
    }

    #[tokio::test]
    async fn test_reply_from_other_observer_is_ignored() {
        let (registry, router) = router();
        router.handle("1", &format!("/subscribe {}", X)).await;
        router.handle("1", &format!("/subscribe {}", Y)).await;

        assert_eq!(router.handle("2", "yes").await, None);
        assert_eq!(registry.get_subscription("1").await.unwrap(), Some(X.to_string()));
        assert!(registry.pending_request("1").await.is_some());
    }

    #[tokio::test]
    async fn test_usage_and_lookups() {
        let (_, router) = router();
        assert_eq!(router.handle("1", "/subscribe").await.unwrap(), SUBSCRIBE_USAGE);
        assert_eq!(router.handle("1", "/check a b").await.unwrap(), CHECK_USAGE);
        assert_eq!(router.handle("1", "/subscribed").await.unwrap(), NOT_SUBSCRIBED);
        assert_eq!(router.handle("1", "/checksubbed").await.unwrap(), NOT_SUBSCRIBED);
        assert_eq!(router.handle("1", &format!("/check {}", X)).await.unwrap(), USER_NOT_FOUND);
        assert!(router.handle("1", "/start").await.unwrap().starts_with("Hello!"));
        assert_eq!(router.handle("1", "/unknown").await, None);
        assert_eq!(router.handle("1", "hello").await, None);
    }
}
