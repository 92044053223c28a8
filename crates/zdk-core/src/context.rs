/// Tool context provided during tool execution
pub trait ToolContext: Send + Sync {
    /// Id of the vendor tool call being served
    fn function_call_id(&self) -> &str;

    /// Id shared by every call dispatched in the same batch
    fn invocation_id(&self) -> &str;
}
