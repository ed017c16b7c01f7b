use crate::EXIT_OK;

/// The MCP client/server is out of scope for this build; `mcp_servers` in
/// config.json is accepted and round-trips, but nothing here dials out to
/// one yet.
pub async fn run() -> i32 {
    println!("mcp: client/server not implemented in this build (contract-only).");
    EXIT_OK
}
