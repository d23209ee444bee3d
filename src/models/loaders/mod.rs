pub mod batch_loader;

pub use batch_loader::{
    cart_add_specs, cart_list_spec, ensure_unique_indices, load_batch, load_item_specs,
    parse_batch, parse_item_spec,
};
