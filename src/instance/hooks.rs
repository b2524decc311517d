use std::rc::Rc;

use tracing::trace;

use super::{InitError, Instance};
use crate::options::{HookError, OptionValue};

/// Run every callback registered under `hook`, in order.
///
/// The first failing callback stops the sequence and its error is returned.
pub fn call_hook(vm: &mut Instance, hook: &str) -> Result<(), InitError> {
    let handlers = match vm.options().get(hook) {
        Some(OptionValue::List(handlers)) => handlers,
        Some(single) => Rc::new(vec![single]),
        None => return Ok(()),
    };

    for (index, handler) in handlers.iter().enumerate() {
        trace!(uid = %vm.uid(), hook, index, "calling hook");
        let result = match handler {
            OptionValue::Hook(callback) => callback.call(vm),
            _ => Err(HookError::new("handler is not callable")),
        };
        result.map_err(|source| InitError::Hook {
            hook: hook.to_string(),
            index,
            uid: vm.uid(),
            source,
        })?;
    }
    Ok(())
}
