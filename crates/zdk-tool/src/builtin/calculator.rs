use crate::FunctionTool;
use schemars::JsonSchema;
use serde::Deserialize;
use zdk_core::{Error, Result, ToolResponse};

/// Name of the toolset holding the calculator tool
pub const CALCULATOR_TOOLSET: &str = "calculator";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculatorParams {
    /// Mathematical expression to evaluate (e.g., '2 + 2', '10 * 5')
    pub expression: String,
}

/// Creates a calculator tool that evaluates mathematical expressions
pub fn create_calculator_tool() -> Result<FunctionTool> {
    FunctionTool::builder()
        .name("evaluate")
        .description(
            "Evaluates mathematical expressions. Supports +, -, *, /, ^, parentheses, \
             numbers and common functions such as sqrt and sin.",
        )
        .params::<CalculatorParams>()
        .handler(|ctx, params: CalculatorParams| async move {
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                tool_call_id = %ctx.function_call_id(),
                expression = %params.expression,
                "Calculating expression"
            );

            let result = evaluate_expression(&params.expression)?;

            Ok(ToolResponse {
                result: serde_json::json!({
                    "result": result,
                    "expression": params.expression
                }),
            })
        })
        .build()
}

fn evaluate_expression(expr: &str) -> Result<f64> {
    let result = meval::eval_str(expr.trim())
        .map_err(|e| Error::tool_failed("evaluate", anyhow::anyhow!("{e}")))?;

    if result.is_finite() {
        Ok(result)
    } else {
        Err(Error::tool_failed(
            "evaluate",
            anyhow::anyhow!("expression '{expr}' has no finite value"),
        ))
    }
}
