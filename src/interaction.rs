//! Pointer interaction dispatch for picked scene objects
//!
//! Hit testing belongs to the rendering engine; this module only receives its
//! results and fans them out to user handlers. A panicking handler is logged
//! and never stops later dispatches.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result of a ray cast against the scene
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// Name of the intersected node
    pub target: Option<String>,
    /// World-space intersection point
    pub point: [f32; 3],
}

impl PickHit {
    pub fn new(target: Option<String>, point: [f32; 3]) -> Self {
        Self { target, point }
    }
}

pub type InteractionHandler = Box<dyn Fn(&PickHit) + Send + Sync>;

/// Optional handlers for each interaction event
#[derive(Default)]
pub struct InteractionHandlers {
    pub on_click: Option<InteractionHandler>,
    pub on_hover: Option<InteractionHandler>,
    pub on_drag_start: Option<InteractionHandler>,
    /// Receives the drag-start target with the current point
    pub on_drag: Option<InteractionHandler>,
    /// Receives the drag-start hit
    pub on_drag_end: Option<InteractionHandler>,
}

impl InteractionHandlers {
    pub fn on_click(mut self, handler: impl Fn(&PickHit) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Box::new(handler));
        self
    }

    pub fn on_hover(mut self, handler: impl Fn(&PickHit) + Send + Sync + 'static) -> Self {
        self.on_hover = Some(Box::new(handler));
        self
    }

    pub fn on_drag_start(mut self, handler: impl Fn(&PickHit) + Send + Sync + 'static) -> Self {
        self.on_drag_start = Some(Box::new(handler));
        self
    }

    pub fn on_drag(mut self, handler: impl Fn(&PickHit) + Send + Sync + 'static) -> Self {
        self.on_drag = Some(Box::new(handler));
        self
    }

    pub fn on_drag_end(mut self, handler: impl Fn(&PickHit) + Send + Sync + 'static) -> Self {
        self.on_drag_end = Some(Box::new(handler));
        self
    }
}

/// Routes pointer events to handlers, tracking the active drag
pub struct InteractionDispatcher {
    handlers: InteractionHandlers,
    drag_start: Option<PickHit>,
    failures: u64,
}

impl std::fmt::Debug for InteractionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionDispatcher")
            .field("drag_start", &self.drag_start)
            .field("failures", &self.failures)
            .finish()
    }
}

impl InteractionDispatcher {
    pub fn new(handlers: InteractionHandlers) -> Self {
        Self {
            handlers,
            drag_start: None,
            failures: 0,
        }
    }

    /// Click or tap
    pub fn click(&mut self, hit: Option<PickHit>) {
        if let Some(hit) = hit {
            self.invoke("onClick", Handler::Click, &hit);
        }
    }

    /// Pointer moved; hovers the hit and continues an active drag
    pub fn pointer_move(&mut self, hit: Option<PickHit>) {
        let Some(hit) = hit else {
            return;
        };
        self.invoke("onHover", Handler::Hover, &hit);

        if let Some(start) = &self.drag_start {
            let dragged = PickHit::new(start.target.clone(), hit.point);
            self.invoke("onDrag", Handler::Drag, &dragged);
        }
    }

    /// Pointer pressed; starts a drag on the hit object
    pub fn pointer_down(&mut self, hit: Option<PickHit>) {
        if let Some(hit) = hit {
            self.invoke("onDragStart", Handler::DragStart, &hit);
            self.drag_start = Some(hit);
        }
    }

    /// Pointer released; ends the active drag
    pub fn pointer_up(&mut self) {
        if let Some(start) = self.drag_start.take() {
            self.invoke("onDragEnd", Handler::DragEnd, &start);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    /// Number of handler invocations that panicked
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn invoke(&mut self, name: &str, which: Handler, hit: &PickHit) {
        let handler = match which {
            Handler::Click => &self.handlers.on_click,
            Handler::Hover => &self.handlers.on_hover,
            Handler::DragStart => &self.handlers.on_drag_start,
            Handler::Drag => &self.handlers.on_drag,
            Handler::DragEnd => &self.handlers.on_drag_end,
        };
        let Some(handler) = handler else {
            return;
        };

        if catch_unwind(AssertUnwindSafe(|| handler(hit))).is_err() {
            log::error!("Error during {name} handler for {:?}", hit.target);
            self.failures += 1;
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Handler {
    Click,
    Hover,
    DragStart,
    Drag,
    DragEnd,
}
