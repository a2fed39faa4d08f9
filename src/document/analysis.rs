use log::*;
use itertools::Itertools;
use std::sync::mpsc::*;
use std::sync::Arc;

use crate::app;
use crate::document::derive::{self, RenderGeometry};
use crate::document::model::*;
use crate::document::undo::{Command, CommandResult, UndoStack};
use crate::util;

pub type Generation = usize;

#[derive(Default)]
pub struct DerivedOutput {
    pub geometry :Option<(Generation, Arc<RenderGeometry>)>,
}

/// Owns the model, its undo stack and the derived render geometry.
/// Every committed edit bumps the generation and re-derives geometry on
/// a background thread; results come back tagged so late arrivals from
/// an obsolete generation are recognizable.
pub struct Analysis {
    model :Model,
    undo :UndoStack<Model, EditClass>,
    generation :Generation,
    sample_step :f32,
    pub output :DerivedOutput,
    chan :Option<Receiver<SetData>>,
    bg :app::BackgroundJobs,
}

#[derive(Debug)]
pub enum SetData {
    Geometry(Generation, Arc<RenderGeometry>),
}

impl app::BackgroundUpdates for Analysis {
    fn check(&mut self) {
        while let Some(Ok(data)) = self.chan.as_mut().map(|r| r.try_recv()) {
            match data {
                SetData::Geometry(g, geo) => { self.output.geometry = Some((g, geo)); },
            }
        }
    }
}

impl Analysis {
    pub fn model(&self) -> &Model { &self.model }

    /// Mutable model access for transient visual state (hover/selection
    /// flags). Structural edits go through `apply`.
    pub(crate) fn model_mut(&mut self) -> &mut Model { &mut self.model }

    pub fn from_model(model :Model, undo_limit :usize, sample_step :f32,
                      bg :app::BackgroundJobs) -> Self {
        Analysis {
            model: model,
            undo: UndoStack::with_limit(undo_limit),
            generation: 0,
            sample_step: sample_step,
            output: Default::default(),
            chan: None,
            bg: bg,
        }
    }

    pub fn generation(&self) -> Generation { self.generation }
    pub fn undo_info(&self) -> String { self.undo.info() }
    pub fn can_undo(&self) -> bool { self.undo.can_undo() }
    pub fn can_redo(&self) -> bool { self.undo.can_redo() }

    /// Execute a command against the model and record it for undo.
    pub fn apply(&mut self, cmd :Box<dyn Command<Model>>,
                 class :Option<EditClass>) -> CommandResult {
        self.undo.push(cmd, class, &mut self.model)?;
        self.on_changed();
        Ok(())
    }

    pub fn override_edit_class(&mut self, cl :EditClass) {
        self.undo.override_edit_class(cl);
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.undo.undo(&mut self.model);
        if changed { self.on_changed(); }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.undo.redo(&mut self.model);
        if changed { self.on_changed(); }
        changed
    }

    pub fn clear_history(&mut self) { self.undo.clear(); }

    fn on_changed(&mut self) {
        self.generation += 1;
        self.update();
    }

    /// Kick off background derivation for the current model, e.g. after
    /// loading a document.
    pub fn refresh(&mut self) { self.update(); }

    fn update(&mut self) {
        let model = self.model.clone(); // persistent structs
        let gen = self.generation;
        let step = self.sample_step;

        let (tx, rx) = channel();
        self.chan = Some(rx);

        self.bg.execute(move || {
            info!("Deriving render geometry for generation {}", gen);
            let geo = Arc::new(derive::compute(&model, step));
            // if the send fails the receiver was replaced by a newer
            // edit, and this result is obsolete anyway
            let _ = tx.send(SetData::Geometry(gen, geo));
        });
    }

    /// Closest pickable object within `tolerance` of `pt`, with its
    /// distance.
    pub fn get_closest(&self, pt :PtC, tolerance :f32) -> Option<(Ref, f32)> {
        let (mut thing, mut dist_sqr) = (None, std::f32::INFINITY);
        let tol_sqr = tolerance * tolerance;

        if let Some((_, geo)) = self.output.geometry.as_ref() {
            for (id, line) in geo.centerlines.iter() {
                for (a, b) in line.iter().tuple_windows() {
                    let (d, _param) = util::dist_to_line_sqr(pt, *a, *b);
                    if d < dist_sqr && d <= tol_sqr {
                        thing = Some(Ref::Road(*id));
                        dist_sqr = d;
                    }
                }
            }
        }

        for (id, actor) in self.model.actors.iter() {
            if let Ok(p) = actor.position.resolve(&self.model) {
                let d = nalgebra_glm::length2(&(p - pt));
                if d < dist_sqr && d <= tol_sqr {
                    thing = Some(Ref::Actor(*id));
                    dist_sqr = d;
                }
            }
        }

        thing.map(|t| (t, dist_sqr.sqrt()))
    }

    pub fn get_rect(&self, a :PtC, b :PtC) -> Vec<Ref> {
        let mut r = Vec::new();
        if let Some((_, geo)) = self.output.geometry.as_ref() {
            for (id, line) in geo.centerlines.iter() {
                if line.iter().any(|p| util::in_rect(*p, a, b)) {
                    r.push(Ref::Road(*id));
                }
            }
        }
        for (id, actor) in self.model.actors.iter() {
            if let Ok(p) = actor.position.resolve(&self.model) {
                if util::in_rect(p, a, b) {
                    r.push(Ref::Actor(*id));
                }
            }
        }
        r
    }
}
