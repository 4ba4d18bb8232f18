//! Layer bookkeeping and the composition commit protocol.
//!
//! The Z-order manager owns a named set of visual layers and decides
//! when the presented tree must be rebuilt: any topology-affecting
//! mutation (add/remove/visibility/reorder) marks it dirty, pure value
//! changes never do. `commit` rebuilds at most once per dirty period
//! and always asks the backend to flush, so value-only changes still
//! reach the screen.

use std::collections::BTreeMap;

use crate::OverlayResult;
use crate::{log_debug, log_warn};

/// The named stacking band a layer belongs to.
///
/// Bands are widely spaced so any number of Custom z-orders can be
/// interleaved without colliding with named bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Background,
    Content,
    Ui,
    Popup,
    Border,
    Foreground,
    Custom,
}

impl LayerKind {
    /// Base of the band in the global stacking order.
    pub fn base_offset(self) -> i32 {
        match self {
            Self::Background => 0,
            Self::Content => 1000,
            Self::Ui => 2000,
            Self::Popup => 3000,
            Self::Border => 4000,
            Self::Foreground => 5000,
            Self::Custom => 10_000,
        }
    }
}

/// Platform seam: the composition backend the manager drives.
pub trait Compose {
    /// Backend handle for one layer's visual.
    type Visual;

    /// Allocates a fresh visual.
    fn create_visual(&mut self) -> OverlayResult<Self::Visual>;

    /// Re-attaches the given visuals in ascending order
    /// (first = bottom of the stack).
    fn restack(&mut self, order: &[&Self::Visual]) -> OverlayResult<()>;

    /// Publishes all pending changes atomically.
    fn commit(&mut self) -> OverlayResult<()>;
}

struct LayerRecord<V> {
    kind: LayerKind,
    z_order: i32,
    visible: bool,
    visual: V,
}

/// Maintains the scene graph of named layers over a [`Compose`] backend.
pub struct ZOrderManager<C: Compose> {
    backend: C,
    layers: BTreeMap<String, LayerRecord<C::Visual>>,
    dirty: bool,
}

impl<C: Compose> ZOrderManager<C> {
    pub fn new(backend: C) -> Self {
        Self {
            backend,
            layers: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Registers a new layer with a backend-allocated visual.
    ///
    /// An already-registered name is left untouched (logged).
    pub fn create_layer(&mut self, name: &str, kind: LayerKind, z_order: i32) -> OverlayResult<()> {
        if self.layers.contains_key(name) {
            log_warn!("layer '{name}' already exists");
            return Ok(());
        }
        let visual = self.backend.create_visual()?;
        self.layers.insert(
            name.to_string(),
            LayerRecord {
                kind,
                z_order,
                visible: true,
                visual,
            },
        );
        self.dirty = true;
        log_debug!("created layer '{name}' ({kind:?}, z={z_order})");
        Ok(())
    }

    /// Registers (or replaces) a layer with a caller-supplied visual.
    pub fn add_layer(&mut self, name: &str, visual: C::Visual, kind: LayerKind, z_order: i32) {
        self.layers.insert(
            name.to_string(),
            LayerRecord {
                kind,
                z_order,
                visible: true,
                visual,
            },
        );
        self.dirty = true;
    }

    /// Removes a layer. Returns whether it existed.
    pub fn remove_layer(&mut self, name: &str) -> bool {
        if self.layers.remove(name).is_some() {
            self.dirty = true;
            true
        } else {
            log_warn!("cannot remove layer '{name}': not found");
            false
        }
    }

    /// Shows or hides a layer. A no-op value never marks dirty.
    pub fn set_visibility(&mut self, name: &str, visible: bool) -> bool {
        let Some(layer) = self.layers.get_mut(name) else {
            log_warn!("cannot set visibility of layer '{name}': not found");
            return false;
        };
        if layer.visible != visible {
            layer.visible = visible;
            self.dirty = true;
        }
        true
    }

    /// Moves a layer to another band and/or z-order. A no-op value
    /// never marks dirty.
    pub fn set_z_order(&mut self, name: &str, kind: LayerKind, z_order: i32) -> bool {
        let Some(layer) = self.layers.get_mut(name) else {
            log_warn!("cannot set z-order of layer '{name}': not found");
            return false;
        };
        if layer.kind != kind || layer.z_order != z_order {
            layer.kind = kind;
            layer.z_order = z_order;
            self.dirty = true;
        }
        true
    }

    /// Backend visual for a layer.
    pub fn visual(&self, name: &str) -> Option<&C::Visual> {
        self.layers.get(name).map(|l| &l.visual)
    }

    pub fn visual_mut(&mut self, name: &str) -> Option<&mut C::Visual> {
        self.layers.get_mut(name).map(|l| &mut l.visual)
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.layers.get(name).is_some_and(|l| l.visible)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The bottom-to-top order a rebuild would present, by name.
    pub fn visible_order(&self) -> Vec<&str> {
        let mut visible: Vec<(&str, &LayerRecord<C::Visual>)> = self
            .layers
            .iter()
            .filter(|(_, l)| l.visible)
            .map(|(n, l)| (n.as_str(), l))
            .collect();
        visible.sort_by_key(|(_, l)| (l.kind.base_offset(), l.z_order));
        visible.into_iter().map(|(n, _)| n).collect()
    }

    /// Rebuilds the presented tree iff topology changed since the last
    /// rebuild, then asks the backend to commit unconditionally (so
    /// value-only changes such as opacity still flush).
    pub fn commit(&mut self) -> OverlayResult<()> {
        if self.dirty {
            let mut visible: Vec<&LayerRecord<C::Visual>> =
                self.layers.values().filter(|l| l.visible).collect();
            visible.sort_by_key(|l| (l.kind.base_offset(), l.z_order));
            let order: Vec<&C::Visual> = visible.iter().map(|l| &l.visual).collect();

            self.backend.restack(&order)?;
            self.dirty = false;
            log_debug!("rebuilt composition tree with {} visible layers", order.len());
        }

        self.backend.commit()
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut C {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every restack and commit the manager issues.
    #[derive(Default)]
    struct FakeCompose {
        next_id: u32,
        restacks: Rc<RefCell<Vec<Vec<u32>>>>,
        commits: Rc<RefCell<usize>>,
    }

    impl Compose for FakeCompose {
        type Visual = u32;

        fn create_visual(&mut self) -> OverlayResult<u32> {
            self.next_id += 1;
            Ok(self.next_id)
        }

        fn restack(&mut self, order: &[&u32]) -> OverlayResult<()> {
            self.restacks
                .borrow_mut()
                .push(order.iter().map(|v| **v).collect());
            Ok(())
        }

        fn commit(&mut self) -> OverlayResult<()> {
            *self.commits.borrow_mut() += 1;
            Ok(())
        }
    }

    fn manager() -> (ZOrderManager<FakeCompose>, Rc<RefCell<Vec<Vec<u32>>>>, Rc<RefCell<usize>>) {
        let backend = FakeCompose::default();
        let restacks = Rc::clone(&backend.restacks);
        let commits = Rc::clone(&backend.commits);
        (ZOrderManager::new(backend), restacks, commits)
    }

    #[test]
    fn layers_present_bottom_to_top_by_band_then_z() {
        let (mut mgr, restacks, _) = manager();
        mgr.create_layer("border", LayerKind::Border, 0).unwrap();
        mgr.create_layer("bg", LayerKind::Background, 0).unwrap();
        mgr.create_layer("content", LayerKind::Content, 0).unwrap();

        mgr.commit().unwrap();

        assert_eq!(mgr.visible_order(), vec!["bg", "content", "border"]);
        // border was created first (visual 1) but presents on top.
        assert_eq!(*restacks.borrow(), vec![vec![2, 3, 1]]);
    }

    #[test]
    fn hiding_a_layer_rebuilds_exactly_once() {
        let (mut mgr, restacks, commits) = manager();
        mgr.create_layer("bg", LayerKind::Background, 0).unwrap();
        mgr.create_layer("content", LayerKind::Content, 0).unwrap();
        mgr.create_layer("border", LayerKind::Border, 0).unwrap();
        mgr.commit().unwrap();

        mgr.set_visibility("border", false);
        mgr.commit().unwrap();

        assert_eq!(mgr.visible_order(), vec!["bg", "content"]);
        assert_eq!(restacks.borrow().len(), 2);
        assert_eq!(restacks.borrow()[1], vec![1, 2]);
        assert_eq!(*commits.borrow(), 2);
    }

    #[test]
    fn double_commit_rebuilds_once_and_flushes_twice() {
        let (mut mgr, restacks, commits) = manager();
        mgr.create_layer("bg", LayerKind::Background, 0).unwrap();

        mgr.commit().unwrap();
        let order_after_first: Vec<String> =
            mgr.visible_order().iter().map(|s| s.to_string()).collect();
        mgr.commit().unwrap();

        assert_eq!(restacks.borrow().len(), 1, "second commit must not rebuild");
        assert_eq!(*commits.borrow(), 2, "backend flush still happens");
        let order_after_second: Vec<String> =
            mgr.visible_order().iter().map(|s| s.to_string()).collect();
        assert_eq!(order_after_second, order_after_first);
    }

    #[test]
    fn noop_mutations_never_mark_dirty() {
        let (mut mgr, restacks, _) = manager();
        mgr.create_layer("bg", LayerKind::Background, 0).unwrap();
        mgr.commit().unwrap();

        mgr.set_visibility("bg", true);
        mgr.set_z_order("bg", LayerKind::Background, 0);
        mgr.commit().unwrap();

        assert_eq!(restacks.borrow().len(), 1);
    }

    #[test]
    fn custom_z_orders_sort_within_their_band() {
        let (mut mgr, _, _) = manager();
        mgr.create_layer("c-high", LayerKind::Custom, 5).unwrap();
        mgr.create_layer("c-low", LayerKind::Custom, -3).unwrap();
        mgr.create_layer("fg", LayerKind::Foreground, 0).unwrap();

        // Foreground's band sits below Custom regardless of z values.
        assert_eq!(mgr.visible_order(), vec!["fg", "c-low", "c-high"]);
    }

    #[test]
    fn equal_keys_present_in_stable_name_order() {
        let (mut mgr, restacks, _) = manager();
        mgr.create_layer("zeta", LayerKind::Ui, 0).unwrap();
        mgr.create_layer("alpha", LayerKind::Ui, 0).unwrap();

        mgr.commit().unwrap();
        mgr.set_visibility("alpha", false);
        mgr.set_visibility("alpha", true);
        mgr.commit().unwrap();

        assert_eq!(mgr.visible_order(), vec!["alpha", "zeta"]);
        assert_eq!(restacks.borrow()[0], restacks.borrow()[1]);
    }

    #[test]
    fn removing_and_readding_marks_dirty() {
        let (mut mgr, restacks, _) = manager();
        mgr.create_layer("bg", LayerKind::Background, 0).unwrap();
        mgr.commit().unwrap();

        assert!(mgr.remove_layer("bg"));
        assert!(!mgr.remove_layer("bg"));
        mgr.commit().unwrap();
        assert_eq!(restacks.borrow()[1], Vec::<u32>::new());

        mgr.add_layer("bg", 99, LayerKind::Background, 0);
        mgr.commit().unwrap();
        assert_eq!(restacks.borrow()[2], vec![99]);
    }

    #[test]
    fn duplicate_create_leaves_layer_untouched() {
        let (mut mgr, _, _) = manager();
        mgr.create_layer("bg", LayerKind::Background, 0).unwrap();
        mgr.set_visibility("bg", false);
        mgr.create_layer("bg", LayerKind::Foreground, 7).unwrap();

        assert!(!mgr.is_visible("bg"));
        assert_eq!(mgr.layer_count(), 1);
        assert_eq!(mgr.visible_order(), Vec::<&str>::new());
    }
}
