use nalgebra_glm as glm;
use ordered_float::OrderedFloat;
use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::fmt;

use crate::document::derive;
use crate::document::model::*;

#[derive(Debug)]
pub enum ScenarioError {
    /// The operation is specified but not built yet. Failing loudly is
    /// preferred over silently returning a wrong value.
    Unimplemented(&'static str),
    MissingRef(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f :&mut fmt::Formatter) -> fmt::Result {
        match self {
            ScenarioError::Unimplemented(what) => write!(f, "not implemented: {}", what),
            ScenarioError::MissingRef(what) => write!(f, "missing reference: {}", what),
        }
    }
}

impl std::error::Error for ScenarioError {}

/// A scenario position, resolvable to a world-space point against the
/// current road network.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub enum Position {
    World { x :f32, y :f32, hdg :f32 },
    /// Road coordinates: distance `s` along the reference line, lateral
    /// offset `t` to its left.
    Road { road :RoadId, s :f32, t :f32 },
    Lane { road :RoadId, lane :LaneId, s :f32 },
    RelativeActor { actor :ActorId, dx :f32, dy :f32 },
}

impl Position {
    pub fn world(x :f32, y :f32, hdg :f32) -> Position {
        Position::World { x, y, hdg }
    }

    /// Heading where the position defines one.
    pub fn heading(&self) -> Option<f32> {
        match self {
            Position::World { hdg, .. } => Some(*hdg),
            _ => None,
        }
    }

    pub fn resolve(&self, model :&Model) -> Result<PtC, ScenarioError> {
        match self {
            Position::World { x, y, .. } => Ok(glm::vec2(*x, *y)),
            Position::Road { road, s, t } => {
                let r = model.roads.get(road)
                    .ok_or_else(|| ScenarioError::MissingRef(format!("road {}", road)))?;
                let geometry :Vec<Geometry> = r.geometry().cloned().collect();
                let (p, hdg) = derive::point_at(&geometry, *s)
                    .ok_or_else(|| ScenarioError::MissingRef(
                        format!("s={} outside road {}", s, road)))?;
                let normal = glm::vec2(-hdg.sin(), hdg.cos());
                Ok(p + normal * *t)
            },
            Position::Lane { .. } =>
                // needs per-lane-section width accumulation
                Err(ScenarioError::Unimplemented("lane position resolution")),
            Position::RelativeActor { actor, dx, dy } => {
                let a = model.actors.get(actor)
                    .ok_or_else(|| ScenarioError::MissingRef(format!("actor {}", actor)))?;
                let base = a.position.resolve(model)?;
                Ok(base + glm::vec2(*dx, *dy))
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Actor {
    pub name :String,
    pub position :Position,
    pub speed :f32,
    #[serde(skip)]
    pub selected :bool,
    #[serde(skip)]
    pub hovered :bool,
}

impl Actor {
    pub fn new(name :String, position :Position) -> Actor {
        Actor { name, position, speed: 0.0, selected: false, hovered: false }
    }
}

use crate::document::overlay::Selectable;

impl Selectable for Actor {
    fn select(&mut self) { self.selected = true; }
    fn unselect(&mut self) { self.selected = false; }
    fn hover_enter(&mut self) { self.hovered = true; }
    fn hover_leave(&mut self) { self.hovered = false; }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub enum Rule { GreaterThan, LessThan, EqualTo }

impl Rule {
    pub fn check(&self, lhs :f64, rhs :f64) -> bool {
        match self {
            Rule::GreaterThan => lhs > rhs,
            Rule::LessThan => lhs < rhs,
            Rule::EqualTo => (lhs - rhs).abs() <= std::f64::EPSILON,
        }
    }
}

/// Live state of one actor during playback.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    pub pos :PtC,
    pub hdg :f32,
    pub speed :f32,
}

pub struct EvalContext<'a> {
    pub model :&'a Model,
    pub time :f64,
    pub states :&'a HashMap<ActorId, ActorState>,
}

impl<'a> EvalContext<'a> {
    fn state(&self, actor :ActorId) -> Result<&ActorState, ScenarioError> {
        self.states.get(&actor)
            .ok_or_else(|| ScenarioError::MissingRef(format!("actor {}", actor)))
    }
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub enum Condition {
    SimulationTime { time :f64, rule :Rule },
    Speed { actor :ActorId, speed :f32, rule :Rule },
    ReachPosition { actor :ActorId, position :Position, tolerance :f32 },
    Distance { a :ActorId, b :ActorId, distance :f32, rule :Rule },
    Collision { actor :ActorId },
    /// Placeholder until storyboard element states are tracked; treated
    /// as never passed.
    ActComplete { act :usize },
}

impl Condition {
    pub fn has_passed(&self, ctx :&EvalContext) -> Result<bool, ScenarioError> {
        match self {
            Condition::SimulationTime { time, rule } =>
                Ok(rule.check(ctx.time, *time)),
            Condition::Speed { actor, speed, rule } =>
                Ok(rule.check(ctx.state(*actor)?.speed as f64, *speed as f64)),
            Condition::ReachPosition { actor, position, tolerance } => {
                let goal = position.resolve(ctx.model)?;
                let pos = ctx.state(*actor)?.pos;
                Ok(glm::length2(&(goal - pos)) <= tolerance * tolerance)
            },
            Condition::Distance { a, b, distance, rule } => {
                let d = glm::distance(&ctx.state(*a)?.pos, &ctx.state(*b)?.pos);
                Ok(rule.check(d as f64, *distance as f64))
            },
            Condition::Collision { .. } =>
                Err(ScenarioError::Unimplemented("collision detection")),
            Condition::ActComplete { .. } => Ok(false),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub enum TriggerRule { All, Any }

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Trigger {
    pub rule :TriggerRule,
    pub conditions :Vec<Condition>,
}

impl Trigger {
    pub fn has_passed(&self, ctx :&EvalContext) -> Result<bool, ScenarioError> {
        match self.rule {
            TriggerRule::All => {
                for c in self.conditions.iter() {
                    if !c.has_passed(ctx)? { return Ok(false); }
                }
                Ok(true)
            },
            TriggerRule::Any => {
                for c in self.conditions.iter() {
                    if c.has_passed(ctx)? { return Ok(true); }
                }
                Ok(false)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub enum Action {
    Teleport { actor :ActorId, to :Position },
    SetSpeed { actor :ActorId, speed :f32 },
    FollowRoad { actor :ActorId, road :RoadId },
}

impl Action {
    pub fn apply(&self, model :&Model,
                 states :&mut HashMap<ActorId, ActorState>) -> Result<(), ScenarioError> {
        match self {
            Action::Teleport { actor, to } => {
                let pos = to.resolve(model)?;
                let state = states.get_mut(actor)
                    .ok_or_else(|| ScenarioError::MissingRef(format!("actor {}", actor)))?;
                state.pos = pos;
                if let Some(hdg) = to.heading() { state.hdg = hdg; }
                Ok(())
            },
            Action::SetSpeed { actor, speed } => {
                let state = states.get_mut(actor)
                    .ok_or_else(|| ScenarioError::MissingRef(format!("actor {}", actor)))?;
                state.speed = *speed;
                Ok(())
            },
            Action::FollowRoad { .. } =>
                Err(ScenarioError::Unimplemented("route following")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Act {
    pub name :String,
    pub start :Trigger,
    pub actions :Vec<Action>,
}

/// The scripted part of a scenario: condition-triggered acts plus a
/// plain timed action list.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Story {
    pub acts :Vec<Act>,
    pub timeline :Vec<(f64, Action)>,
}

impl Story {
    /// Insert a timed action keeping the timeline sorted.
    pub fn insert(&mut self, t :f64, action :Action) {
        let idx = match self.timeline.binary_search_by_key(&OrderedFloat(t),
                    |(t,_)| OrderedFloat(*t)) { Ok(i) | Err(i) => i };
        self.timeline.insert(idx, (t, action));
    }
}
