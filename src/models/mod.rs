pub mod job;
pub mod loaders;
pub mod output;

pub use job::{
    catalog_code_from_url, is_catalog_code, Identifier, JobKind, JobParams, JobResult, JobSpec,
    JobStatus, JsonMap,
};
pub use loaders::{
    cart_add_specs, cart_list_spec, ensure_unique_indices, load_batch, load_item_specs,
    parse_batch, parse_item_spec,
};
pub use output::{cart_table, truncate_text};
