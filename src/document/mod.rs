pub mod analysis;
pub mod derive;
pub mod ids;
pub mod model;
pub mod overlay;
pub mod playback;
pub mod scenario;
pub mod undo;

use crate::app::*;
use crate::config::Config;
use crate::file;

use crate::document::analysis::Analysis;
use crate::document::model::*;
use crate::document::overlay::{EmptyOverlayHandler, NodeOverlayHandler, Visualizer};
use crate::document::scenario::{Actor, Position};
use crate::document::undo::{Command, CommandError, CommandResult, PushValue, SetFields};

/// One open document: the undoable model with derived data, file
/// bookkeeping, overlay state for hover/selection, and an optional
/// running scenario playback.
pub struct Document {
    pub analysis :Analysis,
    pub fileinfo :file::FileInfo,
    pub playback :Option<playback::Playback>,
    actor_overlay :Visualizer<ActorId, Actor>,
    road_overlay :Visualizer<RoadId, Road>,
}

impl Document {
    pub fn empty(config :&Config, bg :BackgroundJobs) -> Self {
        Self::from_model(Model::empty(), config, bg)
    }

    pub fn from_model(mut model :Model, config :&Config, bg :BackgroundJobs) -> Self {
        // re-import every persisted id so later allocations cannot
        // collide, also for documents predating the stored allocator
        let road_ids :Vec<RoadId> = model.roads.keys().cloned().collect();
        let junction_ids :Vec<JunctionId> = model.junctions.keys().cloned().collect();
        let actor_ids :Vec<ActorId> = model.actors.keys().cloned().collect();
        for id in road_ids.into_iter().chain(junction_ids).chain(actor_ids) {
            model.ids.import(id);
        }

        let mut analysis = Analysis::from_model(model, config.undo_limit,
                                                config.sample_step, bg);
        analysis.refresh();
        Document {
            analysis: analysis,
            fileinfo: file::FileInfo::empty(),
            playback: None,
            actor_overlay: Visualizer::new(NodeOverlayHandler),
            road_overlay: Visualizer::new(EmptyOverlayHandler),
        }
    }

    pub fn load(filename :&str, config :&Config, bg :BackgroundJobs)
                -> Result<Document, std::io::Error> {
        let model = file::load(filename)?;
        let mut doc = Self::from_model(model, config, bg);
        doc.fileinfo.set_saved_file(filename.to_string());
        Ok(doc)
    }

    pub fn save_as(&mut self, filename :String) -> Result<(), std::io::Error> {
        file::save(&filename, self.analysis.model())?;
        self.fileinfo.set_saved_file(filename);
        Ok(())
    }

    // -- structural edits, all going through the undo stack --

    pub fn add_road(&mut self, geometry :Vec<Geometry>,
                    junction :Option<JunctionId>) -> Result<RoadId, CommandError> {
        let id = self.analysis.model_mut().ids.unique_id();
        let road = Road::with_geometry(id, format!("road_{}", id), geometry, junction);
        self.analysis.apply(Box::new(AddRoad { id, road }), None)?;
        self.fileinfo.set_unsaved();
        if let Some(r) = self.analysis.model_mut().roads.get_mut(&id) {
            self.road_overlay.added(&id, r);
        }
        Ok(id)
    }

    pub fn add_junction(&mut self, connections :Vec<Connection>)
                        -> Result<JunctionId, CommandError> {
        let id = self.analysis.model_mut().ids.unique_id();
        let junction = Junction { name: format!("junction_{}", id), connections };
        self.analysis.apply(Box::new(AddJunction { id, junction }), None)?;
        self.fileinfo.set_unsaved();
        Ok(id)
    }

    pub fn add_actor(&mut self, position :Position) -> Result<ActorId, CommandError> {
        let id = self.analysis.model_mut().ids.unique_id();
        let actor = Actor::new(format!("actor_{}", id), position);
        self.analysis.apply(Box::new(AddActor { id, actor }), None)?;
        self.fileinfo.set_unsaved();
        if let Some(a) = self.analysis.model_mut().actors.get_mut(&id) {
            self.actor_overlay.added(&id, a);
        }
        Ok(id)
    }

    pub fn add_lane(&mut self, road :RoadId, lane :Lane) -> CommandResult {
        let cmd = PushValue::new("add lane",
            move |m :&mut Model| m.roads.get_mut(&road).map(|r| &mut r.lanes),
            lane);
        self.analysis.apply(Box::new(cmd), None)?;
        self.fileinfo.set_unsaved();
        Ok(())
    }

    pub fn delete(&mut self, r :Ref) -> CommandResult {
        match r {
            Ref::Actor(id) => {
                if let Some(a) = self.analysis.model_mut().actors.get_mut(&id) {
                    self.actor_overlay.removed(&id, a);
                }
            },
            Ref::Road(id) => {
                if let Some(road) = self.analysis.model_mut().roads.get_mut(&id) {
                    self.road_overlay.removed(&id, road);
                }
            },
            _ => {},
        }
        self.analysis.apply(Box::new(RemoveRef::new(r)), None)?;
        self.fileinfo.set_unsaved();
        Ok(())
    }

    /// Consecutive speed edits of the same actor merge into one undo
    /// step.
    pub fn set_actor_speed(&mut self, id :ActorId, speed :f32) -> CommandResult {
        let old = self.analysis.model().actors.get(&id).map(|a| a.speed)
            .ok_or_else(|| CommandError::StaleReference(format!("actor {}", id)))?;
        let cmd = SetFields::new("set actor speed")
            .field("speed",
                   move |m :&mut Model, v| { if let Some(a) = m.actors.get_mut(&id) { a.speed = v; } },
                   old, speed);
        self.analysis.apply(Box::new(cmd), Some(EditClass::ActorSpeed(id)))?;
        self.fileinfo.set_unsaved();
        Ok(())
    }

    pub fn set_road_name(&mut self, id :RoadId, name :String) -> CommandResult {
        let old = self.analysis.model().roads.get(&id).map(|r| r.name.clone())
            .ok_or_else(|| CommandError::StaleReference(format!("road {}", id)))?;
        let cmd = SetFields::new("set road name")
            .field("name",
                   move |m :&mut Model, v| { if let Some(r) = m.roads.get_mut(&id) { r.name = v; } },
                   old, name);
        self.analysis.apply(Box::new(cmd), Some(EditClass::RoadName(id)))?;
        self.fileinfo.set_unsaved();
        Ok(())
    }

    pub fn apply(&mut self, cmd :Box<dyn Command<Model>>,
                 class :Option<EditClass>) -> CommandResult {
        self.analysis.apply(cmd, class)?;
        self.fileinfo.set_unsaved();
        Ok(())
    }

    pub fn undo(&mut self) { if self.analysis.undo() { self.fileinfo.set_unsaved(); } }
    pub fn redo(&mut self) { if self.analysis.redo() { self.fileinfo.set_unsaved(); } }

    // -- hover / selection --

    pub fn hover(&mut self, r :Option<Ref>) {
        for id in self.actor_overlay.take_highlighted() {
            if let Some(a) = self.analysis.model_mut().actors.get_mut(&id) {
                self.actor_overlay.clear_highlight_event(a);
            }
        }
        for id in self.road_overlay.take_highlighted() {
            if let Some(road) = self.analysis.model_mut().roads.get_mut(&id) {
                self.road_overlay.clear_highlight_event(road);
            }
        }
        match r {
            Some(Ref::Actor(id)) => {
                if let Some(a) = self.analysis.model_mut().actors.get_mut(&id) {
                    self.actor_overlay.highlight(id, a);
                }
            },
            Some(Ref::Road(id)) | Some(Ref::Lane(id, _)) => {
                if let Some(road) = self.analysis.model_mut().roads.get_mut(&id) {
                    self.road_overlay.highlight(id, road);
                }
            },
            _ => {},
        }
    }

    pub fn select(&mut self, r :Option<Ref>) {
        if let Some(id) = self.actor_overlay.selected().cloned() {
            match self.analysis.model_mut().actors.get_mut(&id) {
                Some(a) => self.actor_overlay.unselect(&id, a),
                None => self.actor_overlay.forget(&id),
            }
        }
        if let Some(id) = self.road_overlay.selected().cloned() {
            match self.analysis.model_mut().roads.get_mut(&id) {
                Some(road) => self.road_overlay.unselect(&id, road),
                None => self.road_overlay.forget(&id),
            }
        }
        match r {
            Some(Ref::Actor(id)) => {
                if let Some(a) = self.analysis.model_mut().actors.get_mut(&id) {
                    self.actor_overlay.select(id, a);
                }
            },
            Some(Ref::Road(id)) => {
                if let Some(road) = self.analysis.model_mut().roads.get_mut(&id) {
                    self.road_overlay.select(id, road);
                }
            },
            // lanes and junctions have no specialized overlay behavior
            _ => {},
        }
    }

    pub fn selection(&self) -> Option<Ref> {
        if let Some(id) = self.actor_overlay.selected() { return Some(Ref::Actor(*id)); }
        if let Some(id) = self.road_overlay.selected() { return Some(Ref::Road(*id)); }
        None
    }

    pub fn hovered(&self) -> Vec<Ref> {
        self.actor_overlay.highlighted().map(|id| Ref::Actor(*id))
            .chain(self.road_overlay.highlighted().map(|id| Ref::Road(*id)))
            .collect()
    }

    pub fn set_overlays_enabled(&mut self, enabled :bool) {
        self.actor_overlay.set_enabled(enabled);
        self.road_overlay.set_enabled(enabled);
    }

    // -- playback --

    pub fn start_playback(&mut self) {
        self.playback = Some(playback::Playback::from_model(self.analysis.model()));
    }

    pub fn stop_playback(&mut self) {
        self.playback = None;
    }
}

impl BackgroundUpdates for Document {
    fn check(&mut self) {
        self.analysis.check();
    }
}

impl UpdateTime for Document {
    fn advance(&mut self, dt :f64) {
        if let Some(p) = &mut self.playback {
            p.step(self.analysis.model(), dt);
        }
    }
}
