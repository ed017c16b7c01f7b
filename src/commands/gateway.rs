use crate::EXIT_OK;

/// Channel adapters are a contract only (`poll`/`send` trait) in this
/// build — no concrete Telegram/Discord/Slack backend ships, per
/// spec.md's non-goals.
pub async fn run() -> i32 {
    println!("gateway: no channel adapters are configured.");
    println!("The channel contract (poll/send, per-sender allowlists) is implemented at the trait level only;");
    println!("wire up a concrete adapter and call AgentLoop::handle_message per inbound message.");
    EXIT_OK
}
