//! Filter driver for 2D canvas contexts without a programmable shader stage.
//!
//! There are no textures here: each frame folds alpha filters into the context's global alpha
//! and appends native filter strings (`blur(4px)`, `sepia(1)`) to the context's filter. Filters
//! with neither capability are dropped one at a time while the rest of the chain still applies,
//! unlike [`crate::system::FilterSystem`], which skips a whole chain it cannot run.

use std::collections::HashSet;
use std::rc::Rc;

use crate::filter::{CanvasCapability, Filter};
use crate::foundation::error::{FxError, FxResult};

/// Filter state of a canvas-style 2D context.
pub trait CanvasContext {
    /// Current filter string; `"none"` when no filter is active.
    fn filter(&self) -> String;

    fn set_filter(&mut self, filter: &str);

    fn global_alpha(&self) -> f32;

    fn set_global_alpha(&mut self, alpha: f32);
}

/// In-memory [`CanvasContext`] that keeps the values it is given.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasState {
    pub filter: String,
    pub global_alpha: f32,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            filter: "none".to_owned(),
            global_alpha: 1.0,
        }
    }
}

impl CanvasContext for CanvasState {
    fn filter(&self) -> String {
        self.filter.clone()
    }

    fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_owned();
    }

    fn global_alpha(&self) -> f32 {
        self.global_alpha
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.global_alpha = alpha;
    }
}

/// One pushed chain.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasFrame {
    pub skip: bool,
    /// Product of every alpha filter's multiplier.
    pub alpha_multiplier: f32,
    /// Native filter strings, in chain order.
    pub filter_strings: Vec<String>,
    saved_filter: String,
    saved_alpha: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CanvasFilterStats {
    pub pushed: u64,
    pub skipped: u64,
    /// Filters dropped because the context cannot express them.
    pub dropped: u64,
}

pub struct CanvasFilterSystem<C: CanvasContext> {
    ctx: C,
    stack: Vec<CanvasFrame>,
    warned: HashSet<String>,
    stats: CanvasFilterStats,
}

impl<C: CanvasContext> CanvasFilterSystem<C> {
    pub fn new(ctx: C) -> Self {
        Self {
            ctx,
            stack: Vec::new(),
            warned: HashSet::new(),
            stats: CanvasFilterStats::default(),
        }
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    pub fn into_context(self) -> C {
        self.ctx
    }

    pub fn stats(&self) -> CanvasFilterStats {
        self.stats
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Most recently pushed frame.
    pub fn top_frame(&self) -> Option<&CanvasFrame> {
        self.stack.last()
    }

    /// Apply `filters` to the context until the matching [`CanvasFilterSystem::pop`].
    pub fn push(&mut self, filters: &[Rc<dyn Filter>]) {
        self.stats.pushed += 1;

        let mut alpha_multiplier = 1.0f32;
        let mut filter_strings = Vec::new();
        for filter in filters.iter().filter(|f| f.settings().enabled) {
            match filter.canvas_capability() {
                CanvasCapability::AlphaMultiply(a) => alpha_multiplier *= a,
                CanvasCapability::Native(s) => filter_strings.push(s),
                CanvasCapability::Unsupported => {
                    self.stats.dropped += 1;
                    let label = filter.label().to_owned();
                    if self.warned.insert(label.clone()) {
                        tracing::warn!(
                            filter = %label,
                            "filter has no canvas equivalent and is ignored"
                        );
                    }
                }
            }
        }

        let saved_filter = self.ctx.filter();
        let saved_alpha = self.ctx.global_alpha();
        let skip = filter_strings.is_empty() && alpha_multiplier == 1.0;

        if skip {
            tracing::trace!("canvas filter chain is a no-op, skipping frame");
            self.stats.skipped += 1;
        } else {
            if !filter_strings.is_empty() {
                let added = filter_strings.join(" ");
                let combined = if saved_filter.is_empty() || saved_filter == "none" {
                    added
                } else {
                    format!("{saved_filter} {added}")
                };
                self.ctx.set_filter(&combined);
            }
            if alpha_multiplier != 1.0 {
                self.ctx.set_global_alpha(saved_alpha * alpha_multiplier);
            }
        }

        self.stack.push(CanvasFrame {
            skip,
            alpha_multiplier,
            filter_strings,
            saved_filter,
            saved_alpha,
        });
    }

    /// Restore the context state saved by the matching push.
    pub fn pop(&mut self) -> FxResult<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| FxError::backend("canvas filter pop without a matching push"))?;
        if frame.skip {
            return Ok(());
        }
        self.ctx.set_filter(&frame.saved_filter);
        self.ctx.set_global_alpha(frame.saved_alpha);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/mod.rs"]
mod tests;
