pub mod button;
pub mod devextreme;
pub mod form_field;
pub mod generic;
pub mod menu_item;

pub use button::ButtonStrategy;
pub use devextreme::DevExtremeStrategy;
pub use form_field::FormFieldStrategy;
pub use generic::GenericStrategy;
pub use menu_item::MenuItemStrategy;

use crate::strategy::{Strategy, sort_by_priority};

/// The five built-in strategies, highest priority first.
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    let mut strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(GenericStrategy::new()),
        Box::new(MenuItemStrategy::new()),
        Box::new(FormFieldStrategy::new()),
        Box::new(ButtonStrategy::new()),
        Box::new(DevExtremeStrategy::new()),
    ];
    sort_by_priority(&mut strategies);
    strategies
}
