use serde_json::Value;

use super::batch_table::SharedBatchTable;
use super::color::Color;

/// Handle to one instance of a tile's content, bound to its batch table.
#[derive(Debug, Clone)]
pub struct Feature {
    batch_table: SharedBatchTable,
    batch_id: usize,
}

impl Feature {
    pub(crate) fn new(batch_table: SharedBatchTable, batch_id: usize) -> Self {
        Self {
            batch_table,
            batch_id,
        }
    }

    pub fn batch_id(&self) -> usize {
        self.batch_id
    }

    pub fn show(&self) -> bool {
        self.batch_table.borrow().show(self.batch_id)
    }

    pub fn set_show(&self, show: bool) {
        self.batch_table.borrow_mut().set_show(self.batch_id, show);
    }

    pub fn color(&self) -> Color {
        self.batch_table.borrow().color(self.batch_id)
    }

    pub fn set_color(&self, color: Color) {
        self.batch_table.borrow_mut().set_color(self.batch_id, color);
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.batch_table.borrow().has_property(name)
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.batch_table.borrow().property(self.batch_id, name).cloned()
    }

    pub fn set_property(&self, name: &str, value: Value) {
        self.batch_table
            .borrow_mut()
            .set_property(self.batch_id, name, value);
    }
}
