mod gateway;
mod stdio;

pub(crate) use gateway::run_gateway_mode;
pub(crate) use stdio::run_stdio_mode;
