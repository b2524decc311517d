//! Component configuration model
//!
//! Values, shared configuration objects, asset registries, the merge-strategy
//! table and the hook deduplicator used when cached options are rebuilt.

mod dedupe;
mod merge;
mod object;
mod registry;
mod strategy;
mod value;

pub use dedupe::dedupe;
pub use merge::merge_options;
pub use object::{Options, OptionsRef};
pub use registry::Registry;
pub use strategy::{
    evaluate_data, merge_data, CustomMerge, MergeContext, MergeStrategy, StrategyTable,
    ASSET_TYPES, LIFECYCLE_HOOKS,
};
pub use value::{ComponentRef, DataFn, DataMap, Hook, HookError, HookResult, OptionValue};
