//! Terminal output for the CLI
//!
//! Styled with `console` when attached to a terminal, plain bracketed
//! prefixes otherwise so output stays readable in CI logs.
//!
//! ```rust,ignore
//! use async_locator::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::step_ok(&ctx, "Location found");
//! ui::key_value(&ctx, "position", "(500, 64, -300)");
//! ```

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    key_value, remark, section, step_error, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
