//! Print layer selection and ordering.

use thiserror::Error;
use tracing::debug;

use super::types::LayerKind;

/// An active layer together with its draw-order key.
///
/// Keys compare lexicographically; lower keys are drawn first.
#[derive(Debug, Clone)]
pub struct ActiveLayer {
    pub layer: LayerKind,
    pub order: Vec<i32>,
}

impl ActiveLayer {
    pub fn new(layer: LayerKind, order: Vec<i32>) -> Self {
        Self { layer, order }
    }
}

/// Errors raised while selecting layers, before any tile is requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Printing layer \"{0}\" is not supported")]
    NotPrintable(String),
}

/// Filters `active` to print-eligible layers in back-to-front order.
///
/// Overlays without `print` are skipped. An active base layer without
/// `print` fails the whole selection. Layers with equal keys keep their
/// input order.
pub fn select_print_layers(active: &[ActiveLayer]) -> Result<Vec<LayerKind>, SelectionError> {
    let mut selected: Vec<&ActiveLayer> = Vec::with_capacity(active.len());

    for entry in active {
        let options = entry.layer.options();
        if options.print {
            selected.push(entry);
        } else if options.is_overlay {
            debug!(layer = %options.short_name, "Skipping non-printable overlay");
        } else {
            return Err(SelectionError::NotPrintable(options.short_name.clone()));
        }
    }

    selected.sort_by(|a, b| a.order.cmp(&b.order));
    Ok(selected.into_iter().map(|entry| entry.layer.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::PrintOptions;
    use crate::layer::{DecorationLayer, LayerError, LayerOptions, SyntheticTile};

    struct Named(LayerOptions);

    impl DecorationLayer for Named {
        fn options(&self) -> &LayerOptions {
            &self.0
        }

        fn tiles(&self, _options: &PrintOptions) -> Result<Vec<SyntheticTile>, LayerError> {
            Ok(Vec::new())
        }
    }

    fn active(options: LayerOptions, order: Vec<i32>) -> ActiveLayer {
        ActiveLayer::new(LayerKind::decoration(Named(options)), order)
    }

    fn names(layers: &[LayerKind]) -> Vec<&str> {
        layers.iter().map(|l| l.short_name()).collect()
    }

    #[test]
    fn test_orders_by_key() {
        let layers = vec![
            active(LayerOptions::overlay("S"), vec![2]),
            active(LayerOptions::base("O"), vec![1]),
            active(LayerOptions::overlay("T"), vec![1, 5]),
        ];
        let selected = select_print_layers(&layers).unwrap();
        assert_eq!(names(&selected), vec!["O", "T", "S"]);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let layers = vec![
            active(LayerOptions::overlay("B"), vec![3]),
            active(LayerOptions::overlay("A"), vec![3]),
        ];
        let selected = select_print_layers(&layers).unwrap();
        assert_eq!(names(&selected), vec!["B", "A"]);
    }

    #[test]
    fn test_skips_non_printable_overlay() {
        let layers = vec![
            active(LayerOptions::base("O"), vec![1]),
            active(LayerOptions::overlay("W").with_print(false), vec![2]),
        ];
        let selected = select_print_layers(&layers).unwrap();
        assert_eq!(names(&selected), vec!["O"]);
    }

    #[test]
    fn test_non_printable_base_is_fatal() {
        let layers = vec![
            active(LayerOptions::base("Y").with_print(false), vec![1]),
            active(LayerOptions::overlay("S"), vec![2]),
        ];
        let err = select_print_layers(&layers).unwrap_err();
        assert_eq!(err, SelectionError::NotPrintable("Y".to_string()));
        assert_eq!(err.to_string(), "Printing layer \"Y\" is not supported");
    }

    #[test]
    fn test_empty_selection() {
        assert!(select_print_layers(&[]).unwrap().is_empty());
    }
}
