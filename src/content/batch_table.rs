//! Per-instance properties and render-time colors keyed by batch id

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

use super::color::Color;
use crate::error::FormatError;

/// Batch table shared between its content, the content's features and the
/// instance collection that uploads the colors.
pub type SharedBatchTable = Rc<RefCell<BatchTable>>;

#[derive(Debug, Clone)]
pub struct BatchTable {
    instances_length: usize,
    /// Property name -> array with one value per batch id
    properties: Map<String, Value>,
    colors: Vec<Color>,
    show: Vec<bool>,
    colors_dirty: bool,
}

impl BatchTable {
    /// Builds a table for `instances_length` batch ids from the tile's JSON.
    ///
    /// Every property must be an array with exactly one entry per batch id.
    pub fn new(instances_length: usize, json: Option<Map<String, Value>>) -> Result<Self, FormatError> {
        let properties = json.unwrap_or_default();
        for (name, value) in &properties {
            match value {
                Value::Array(values) if values.len() == instances_length => {}
                Value::Array(values) => {
                    return Err(FormatError::BadBatchTable(format!(
                        "property '{}' has {} values for {} instances",
                        name,
                        values.len(),
                        instances_length
                    )))
                }
                _ => {
                    return Err(FormatError::BadBatchTable(format!(
                        "property '{}' is not an array",
                        name
                    )))
                }
            }
        }

        Ok(Self {
            instances_length,
            properties,
            colors: vec![Color::WHITE; instances_length],
            show: vec![true; instances_length],
            colors_dirty: false,
        })
    }

    pub fn instances_length(&self) -> usize {
        self.instances_length
    }

    fn check_batch_id(&self, batch_id: usize) {
        assert!(
            batch_id < self.instances_length,
            "batch id {} out of range, must be in [0, {})",
            batch_id,
            self.instances_length
        );
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn property(&self, batch_id: usize, name: &str) -> Option<&Value> {
        self.check_batch_id(batch_id);
        self.properties
            .get(name)
            .and_then(|values| values.as_array())
            .and_then(|values| values.get(batch_id))
    }

    /// Sets a property value, creating the property (null for every other id) if needed.
    pub fn set_property(&mut self, batch_id: usize, name: &str, value: Value) {
        self.check_batch_id(batch_id);
        let len = self.instances_length;
        let entry = self
            .properties
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(vec![Value::Null; len]));
        if let Value::Array(values) = entry {
            values[batch_id] = value;
        }
    }

    pub fn color(&self, batch_id: usize) -> Color {
        self.check_batch_id(batch_id);
        self.colors[batch_id]
    }

    pub fn set_color(&mut self, batch_id: usize, color: Color) {
        self.check_batch_id(batch_id);
        if self.colors[batch_id] != color {
            self.colors[batch_id] = color;
            self.colors_dirty = true;
        }
    }

    pub fn set_all_colors(&mut self, color: Color) {
        for c in &mut self.colors {
            if *c != color {
                *c = color;
                self.colors_dirty = true;
            }
        }
    }

    pub fn show(&self, batch_id: usize) -> bool {
        self.check_batch_id(batch_id);
        self.show[batch_id]
    }

    pub fn set_show(&mut self, batch_id: usize, show: bool) {
        self.check_batch_id(batch_id);
        if self.show[batch_id] != show {
            self.show[batch_id] = show;
            self.colors_dirty = true;
        }
    }

    /// Per-instance colors as raw bytes; hidden instances have zero alpha.
    pub fn color_bytes(&self) -> Vec<u8> {
        let colors: Vec<Color> = self
            .colors
            .iter()
            .zip(&self.show)
            .map(|(c, &show)| if show { *c } else { Color { alpha: 0.0, ..*c } })
            .collect();
        bytemuck::cast_slice(&colors).to_vec()
    }

    /// Returns whether colors changed since the last call.
    pub fn take_colors_dirty(&mut self) -> bool {
        std::mem::take(&mut self.colors_dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> BatchTable {
        let json = json!({ "height": [10, 20, 30], "name": ["a", "b", "c"] });
        BatchTable::new(3, json.as_object().cloned()).unwrap()
    }

    #[test]
    fn property_lookup() {
        let table = table();
        assert!(table.has_property("height"));
        assert!(!table.has_property("width"));
        assert_eq!(table.property(1, "name"), Some(&json!("b")));
        assert_eq!(table.property(1, "width"), None);
    }

    #[test]
    fn set_property_creates_missing_column() {
        let mut table = table();
        table.set_property(2, "width", json!(4.5));
        assert_eq!(table.property(2, "width"), Some(&json!(4.5)));
        assert_eq!(table.property(0, "width"), Some(&Value::Null));
    }

    #[test]
    fn rejects_mismatched_property_length() {
        let json = json!({ "height": [1, 2] });
        assert!(matches!(
            BatchTable::new(3, json.as_object().cloned()),
            Err(FormatError::BadBatchTable(_))
        ));
    }

    #[test]
    fn colors_track_dirty_state() {
        let mut table = table();
        assert!(!table.take_colors_dirty());
        table.set_all_colors(Color::new(1.0, 0.0, 0.0, 1.0));
        assert!(table.take_colors_dirty());
        assert!(!table.take_colors_dirty());
        table.set_show(0, false);
        let bytes = table.color_bytes();
        assert_eq!(bytes.len(), 3 * 16);
        let first: Color = bytemuck::pod_read_unaligned(&bytes[0..16]);
        assert_eq!(first.alpha, 0.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_batch_id_panics() {
        table().color(3);
    }
}
