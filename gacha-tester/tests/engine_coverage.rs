#[path = "../../gacha-engine/tests/roll_acceptance.rs"]
mod roll_acceptance;

#[path = "../../gacha-engine/tests/session_flow.rs"]
mod session_flow;
