use nalgebra_glm as glm;
use serde::{Serialize, Deserialize};

use crate::document::ids::IdAllocator;
use crate::document::scenario::{Actor, Story};
use crate::document::undo::{Command, CommandError, CommandResult};

pub type PtC = glm::Vec2;

pub type RoadId = usize;
pub type JunctionId = usize;
pub type ActorId = usize;
pub type LaneId = i32;

/// One piece of a road reference line, in road coordinates: the piece
/// covers `s .. s+length` along the spline.
#[derive(Debug, Copy, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Geometry {
    pub s :f32,
    pub x :f32,
    pub y :f32,
    pub hdg :f32,
    pub length :f32,
    pub kind :GeometryKind,
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub enum GeometryKind {
    Line,
    Arc { curvature :f32 },
}

impl Geometry {
    pub fn line(s :f32, start :(f32,f32), hdg :f32, length :f32) -> Geometry {
        Geometry { s, x: start.0, y: start.1, hdg, length, kind: GeometryKind::Line }
    }

    pub fn arc(s :f32, start :(f32,f32), hdg :f32, length :f32, curvature :f32) -> Geometry {
        Geometry { s, x: start.0, y: start.1, hdg, length, kind: GeometryKind::Arc { curvature } }
    }

    pub fn start_point(&self) -> PtC { glm::vec2(self.x, self.y) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub enum SegmentKind { Road, Junction, None }

/// A contiguous typed span of a road spline. Constructed once when the
/// owning road is built and not mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct RoadSegment {
    start :f32,
    road :RoadId,
    kind :SegmentKind,
    geometry :Vec<Geometry>,
}

impl RoadSegment {
    pub fn new(start :f32, road :RoadId, kind :SegmentKind, geometry :Vec<Geometry>) -> RoadSegment {
        RoadSegment { start, road, kind, geometry }
    }

    pub fn start(&self) -> f32 { self.start }
    pub fn road(&self) -> RoadId { self.road }
    pub fn kind(&self) -> SegmentKind { self.kind }
    pub fn geometry(&self) -> &[Geometry] { &self.geometry }

    pub fn length(&self) -> f32 {
        self.geometry.iter().map(|g| g.length).sum()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub enum LaneKind { Driving, Shoulder, Sidewalk, Border, Median }

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Lane {
    pub id :LaneId,
    pub kind :LaneKind,
    pub width :f32,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Road {
    pub name :String,
    pub segments :Vec<RoadSegment>,
    pub lanes :Vec<Lane>,
    pub junction :Option<JunctionId>,
    pub predecessor :Option<RoadId>,
    pub successor :Option<RoadId>,
}

impl Road {
    /// Build a road with a single typed segment spanning the given
    /// reference line. Roads inside a junction get `Junction` spans.
    pub fn with_geometry(id :RoadId, name :String, geometry :Vec<Geometry>,
                         junction :Option<JunctionId>) -> Road {
        let kind = if junction.is_some() { SegmentKind::Junction } else { SegmentKind::Road };
        Road {
            name: name,
            segments: vec![RoadSegment::new(0.0, id, kind, geometry)],
            lanes: Vec::new(),
            junction: junction,
            predecessor: None,
            successor: None,
        }
    }

    pub fn length(&self) -> f32 {
        self.segments.iter().map(|s| s.length()).sum()
    }

    pub fn segment_at(&self, s :f32) -> Option<&RoadSegment> {
        self.segments.iter().rev().find(|seg| seg.start() <= s)
    }

    pub fn geometry(&self) -> impl Iterator<Item = &Geometry> {
        self.segments.iter().flat_map(|s| s.geometry().iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct Connection {
    pub incoming :RoadId,
    pub connecting :RoadId,
    /// Whether the connecting road is entered at s=0.
    pub contact_start :bool,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Junction {
    pub name :String,
    pub connections :Vec<Connection>,
}

#[derive(Clone, Default, Debug)]
#[derive(Serialize, Deserialize)]
pub struct Model {
    pub roads :im::HashMap<RoadId, Road>,
    pub junctions :im::HashMap<JunctionId, Junction>,
    pub actors :im::HashMap<ActorId, Actor>,
    pub story :Story,
    pub ids :IdAllocator,
}

#[derive(Hash, PartialEq, Eq)]
#[derive(Copy, Clone)]
#[derive(Debug)]
pub enum Ref {
    Road(RoadId),
    Lane(RoadId, LaneId),
    Junction(JunctionId),
    Actor(ActorId),
}

impl Model {
    pub fn empty() -> Self { Default::default() }

    pub fn delete(&mut self, x :Ref) {
        match x {
            Ref::Road(id) => { self.roads.remove(&id); },
            Ref::Lane(road, lane) => {
                if let Some(r) = self.roads.get_mut(&road) {
                    r.lanes.retain(|l| l.id != lane);
                }
            },
            Ref::Junction(id) => { self.junctions.remove(&id); },
            Ref::Actor(id) => { self.actors.remove(&id); },
        }
    }

    pub fn contains(&self, x :Ref) -> bool {
        match x {
            Ref::Road(id) => self.roads.contains_key(&id),
            Ref::Lane(road, lane) =>
                self.roads.get(&road).map(|r| r.lanes.iter().any(|l| l.id == lane)).unwrap_or(false),
            Ref::Junction(id) => self.junctions.contains_key(&id),
            Ref::Actor(id) => self.actors.contains_key(&id),
        }
    }
}

/// Edit classes join consecutive edits of the same control into one
/// undo step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditClass {
    MoveActor(ActorId),
    ActorSpeed(ActorId),
    RoadName(RoadId),
    LaneWidth(RoadId, LaneId),
    StoryTime(usize),
}

// Model commands. Entity ids are allocated by the caller through
// `Model::ids` before the command is constructed, so redo reuses the
// same id.

pub struct AddRoad {
    pub id :RoadId,
    pub road :Road,
}

impl Command<Model> for AddRoad {
    fn label(&self) -> &str { "add road" }

    fn execute(&mut self, m :&mut Model) -> CommandResult {
        m.roads.insert(self.id, self.road.clone());
        Ok(())
    }

    fn undo(&mut self, m :&mut Model) -> CommandResult {
        m.roads.remove(&self.id)
            .map(|_| ())
            .ok_or_else(|| CommandError::StaleReference(format!("road {} is gone", self.id)))
    }
}

pub struct AddJunction {
    pub id :JunctionId,
    pub junction :Junction,
}

impl Command<Model> for AddJunction {
    fn label(&self) -> &str { "add junction" }

    fn execute(&mut self, m :&mut Model) -> CommandResult {
        m.junctions.insert(self.id, self.junction.clone());
        Ok(())
    }

    fn undo(&mut self, m :&mut Model) -> CommandResult {
        m.junctions.remove(&self.id)
            .map(|_| ())
            .ok_or_else(|| CommandError::StaleReference(format!("junction {} is gone", self.id)))
    }
}

pub struct AddActor {
    pub id :ActorId,
    pub actor :Actor,
}

impl Command<Model> for AddActor {
    fn label(&self) -> &str { "add actor" }

    fn execute(&mut self, m :&mut Model) -> CommandResult {
        m.actors.insert(self.id, self.actor.clone());
        Ok(())
    }

    fn undo(&mut self, m :&mut Model) -> CommandResult {
        m.actors.remove(&self.id)
            .map(|_| ())
            .ok_or_else(|| CommandError::StaleReference(format!("actor {} is gone", self.id)))
    }
}

enum Removed {
    Road(Road),
    Junction(Junction),
    Actor(Actor),
    Lane(usize, Lane),
}

/// Removes any model part addressed by a `Ref`, restoring it on undo.
pub struct RemoveRef {
    r :Ref,
    removed :Option<Removed>,
}

impl RemoveRef {
    pub fn new(r :Ref) -> Self { RemoveRef { r, removed: None } }
}

impl Command<Model> for RemoveRef {
    fn label(&self) -> &str { "remove" }

    fn execute(&mut self, m :&mut Model) -> CommandResult {
        let r = self.r;
        let stale = move || CommandError::StaleReference(format!("{:?} not in model", r));
        match self.r {
            Ref::Road(id) => {
                let road = m.roads.remove(&id).ok_or_else(stale)?;
                self.removed = Some(Removed::Road(road));
            },
            Ref::Junction(id) => {
                let junction = m.junctions.remove(&id).ok_or_else(stale)?;
                self.removed = Some(Removed::Junction(junction));
            },
            Ref::Actor(id) => {
                let actor = m.actors.remove(&id).ok_or_else(stale)?;
                self.removed = Some(Removed::Actor(actor));
            },
            Ref::Lane(road, lane) => {
                let r = m.roads.get_mut(&road).ok_or_else(stale)?;
                let idx = r.lanes.iter().position(|l| l.id == lane).ok_or_else(stale)?;
                let l = r.lanes.remove(idx);
                self.removed = Some(Removed::Lane(idx, l));
            },
        }
        Ok(())
    }

    fn undo(&mut self, m :&mut Model) -> CommandResult {
        let removed = self.removed.take()
            .ok_or_else(|| CommandError::Invalid("undo before execute".to_string()))?;
        match (self.r, removed) {
            (Ref::Road(id), Removed::Road(road)) => { m.roads.insert(id, road); },
            (Ref::Junction(id), Removed::Junction(junction)) => { m.junctions.insert(id, junction); },
            (Ref::Actor(id), Removed::Actor(actor)) => { m.actors.insert(id, actor); },
            (Ref::Lane(road, _), Removed::Lane(idx, lane)) => {
                let r = m.roads.get_mut(&road)
                    .ok_or_else(|| CommandError::StaleReference(format!("road {} is gone", road)))?;
                let idx = idx.min(r.lanes.len());
                r.lanes.insert(idx, lane);
            },
            _ => return Err(CommandError::Invalid("mismatched removal payload".to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::scenario::{Actor, Position};
    use crate::document::undo::{PushValue, UndoStack};

    fn straight_road(m :&mut Model, length :f32) -> RoadId {
        let id = m.ids.unique_id();
        let name = format!("road_{}", id);
        let geometry = vec![Geometry::line(0.0, (0.0, 0.0), 0.0, length)];
        let mut cmd = AddRoad { id, road: Road::with_geometry(id, name, geometry, None) };
        cmd.execute(m).unwrap();
        id
    }

    #[test]
    fn road_segments_cover_reference_line() {
        let mut m = Model::empty();
        let id = straight_road(&mut m, 80.0);
        let road = m.roads.get(&id).unwrap();
        assert_eq!(road.length(), 80.0);
        let seg = road.segment_at(40.0).unwrap();
        assert_eq!(seg.kind(), SegmentKind::Road);
        assert_eq!(seg.road(), id);
        assert_eq!(seg.start(), 0.0);
    }

    #[test]
    fn junction_roads_get_junction_segments() {
        let mut m = Model::empty();
        let jid = m.ids.unique_id();
        let mut cmd = AddJunction {
            id: jid,
            junction: Junction { name: "j".to_string(), connections: Vec::new() },
        };
        cmd.execute(&mut m).unwrap();

        let rid = m.ids.unique_id();
        let geometry = vec![Geometry::arc(0.0, (0.0, 0.0), 0.0, 10.0, 0.1)];
        let road = Road::with_geometry(rid, "conn".to_string(), geometry, Some(jid));
        assert_eq!(road.segments[0].kind(), SegmentKind::Junction);
    }

    #[test]
    fn add_road_round_trip() {
        let mut m = Model::empty();
        let before = m.roads.len();
        let id = straight_road(&mut m, 10.0);
        let mut cmd = RemoveRef::new(Ref::Road(id));
        cmd.execute(&mut m).unwrap();
        assert_eq!(m.roads.len(), before);
        cmd.undo(&mut m).unwrap();
        assert!(m.contains(Ref::Road(id)));
    }

    #[test]
    fn remove_lane_restores_position() {
        let mut m = Model::empty();
        let id = straight_road(&mut m, 10.0);
        {
            let r = m.roads.get_mut(&id).unwrap();
            r.lanes.push(Lane { id: -1, kind: LaneKind::Driving, width: 3.5 });
            r.lanes.push(Lane { id: -2, kind: LaneKind::Shoulder, width: 1.0 });
        }
        let mut cmd = RemoveRef::new(Ref::Lane(id, -1));
        cmd.execute(&mut m).unwrap();
        assert_eq!(m.roads.get(&id).unwrap().lanes.len(), 1);
        cmd.undo(&mut m).unwrap();
        let lanes = &m.roads.get(&id).unwrap().lanes;
        assert_eq!(lanes[0].id, -1);
        assert_eq!(lanes[1].id, -2);
    }

    #[test]
    fn remove_missing_ref_is_stale() {
        let mut m = Model::empty();
        let mut cmd = RemoveRef::new(Ref::Actor(42));
        assert!(cmd.execute(&mut m).is_err());
    }

    #[test]
    fn push_lane_through_stack() {
        let mut m = Model::empty();
        let id = straight_road(&mut m, 10.0);
        let mut stack :UndoStack<Model, EditClass> = UndoStack::new();

        let lane = Lane { id: -1, kind: LaneKind::Driving, width: 3.5 };
        let cmd = PushValue::new("add lane",
            move |m :&mut Model| m.roads.get_mut(&id).map(|r| &mut r.lanes),
            lane);
        stack.push(Box::new(cmd), None, &mut m).unwrap();
        assert_eq!(m.roads.get(&id).unwrap().lanes.len(), 1);

        stack.undo(&mut m);
        assert_eq!(m.roads.get(&id).unwrap().lanes.len(), 0);
        stack.redo(&mut m);
        assert_eq!(m.roads.get(&id).unwrap().lanes.len(), 1);
    }

    #[test]
    fn actor_round_trip() {
        let mut m = Model::empty();
        let id = m.ids.unique_id();
        let actor = Actor::new("ego".to_string(), Position::world(5.0, 0.0, 0.0));
        let mut cmd = AddActor { id, actor };
        cmd.execute(&mut m).unwrap();
        assert!(m.contains(Ref::Actor(id)));
        cmd.undo(&mut m).unwrap();
        assert!(!m.contains(Ref::Actor(id)));
        cmd.redo(&mut m).unwrap();
        assert!(m.contains(Ref::Actor(id)));
    }
}
