use log::*;
use nalgebra_glm as glm;
use std::collections::HashMap;

use crate::document::model::*;
use crate::document::scenario::*;

/// Headless playback of the scripted scenario: actors move along their
/// heading at their current speed, timeline actions fire at their
/// scheduled times, and act triggers are polled each step.
pub struct Playback {
    pub time :f64,
    pub states :HashMap<ActorId, ActorState>,
    cursor :usize,
    started_acts :Vec<bool>,
}

impl Playback {
    pub fn from_model(model :&Model) -> Playback {
        let mut states = HashMap::new();
        for (id, actor) in model.actors.iter() {
            match actor.position.resolve(model) {
                Ok(pos) => {
                    let hdg = actor.position.heading().unwrap_or(0.0);
                    states.insert(*id, ActorState { pos, hdg, speed: actor.speed });
                },
                Err(e) => {
                    warn!("Actor {:?} has unresolvable start position: {}", actor.name, e);
                },
            }
        }
        Playback {
            time: 0.0,
            states: states,
            cursor: 0,
            started_acts: vec![false; model.story.acts.len()],
        }
    }

    pub fn step(&mut self, model :&Model, dt :f64) {
        self.time += dt;

        // scheduled actions, in timeline order
        while let Some((t, action)) = model.story.timeline.get(self.cursor) {
            if *t > self.time { break; }
            if let Err(e) = action.apply(model, &mut self.states) {
                warn!("Timeline action failed: {}", e);
            }
            self.cursor += 1;
        }

        // condition-triggered acts, started at most once
        for (i, act) in model.story.acts.iter().enumerate() {
            // acts added mid-playback are ignored until restart
            if self.started_acts.get(i).cloned().unwrap_or(true) { continue; }
            let passed = {
                let ctx = EvalContext { model, time: self.time, states: &self.states };
                act.start.has_passed(&ctx)
            };
            match passed {
                Ok(true) => {
                    info!("Act {:?} started at t={:.2}", act.name, self.time);
                    self.started_acts[i] = true;
                    for a in act.actions.iter() {
                        if let Err(e) = a.apply(model, &mut self.states) {
                            warn!("Act action failed: {}", e);
                        }
                    }
                },
                Ok(false) => {},
                Err(e) => {
                    warn!("Trigger for act {:?} failed: {}", act.name, e);
                },
            }
        }

        for state in self.states.values_mut() {
            let dir = glm::vec2(state.hdg.cos(), state.hdg.sin());
            state.pos += dir * (state.speed * dt as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_actor(speed :f32) -> (Model, ActorId) {
        let mut m = Model::empty();
        let id = m.ids.unique_id();
        let mut actor = Actor::new("ego".to_string(), Position::world(0.0, 0.0, 0.0));
        actor.speed = speed;
        m.actors.insert(id, actor);
        (m, id)
    }

    #[test]
    fn actors_move_along_heading() {
        let (m, id) = model_with_actor(10.0);
        let mut p = Playback::from_model(&m);
        p.step(&m, 0.5);
        let s = p.states.get(&id).unwrap();
        assert!((s.pos.x - 5.0).abs() < 1e-4);
        assert_eq!(s.pos.y, 0.0);
    }

    #[test]
    fn timeline_actions_fire_in_order() {
        let (mut m, id) = model_with_actor(0.0);
        m.story.insert(2.0, Action::SetSpeed { actor: id, speed: 7.0 });
        m.story.insert(1.0, Action::SetSpeed { actor: id, speed: 3.0 });

        let mut p = Playback::from_model(&m);
        p.step(&m, 1.5);
        assert_eq!(p.states.get(&id).unwrap().speed, 3.0);
        p.step(&m, 1.0);
        assert_eq!(p.states.get(&id).unwrap().speed, 7.0);
    }

    #[test]
    fn act_triggers_once() {
        let (mut m, id) = model_with_actor(0.0);
        m.story.acts.push(Act {
            name: "speed up".to_string(),
            start: Trigger {
                rule: TriggerRule::All,
                conditions: vec![Condition::SimulationTime { time: 1.0, rule: Rule::GreaterThan }],
            },
            actions: vec![Action::SetSpeed { actor: id, speed: 20.0 }],
        });

        let mut p = Playback::from_model(&m);
        p.step(&m, 0.5);
        assert_eq!(p.states.get(&id).unwrap().speed, 0.0);
        p.step(&m, 1.0);
        assert_eq!(p.states.get(&id).unwrap().speed, 20.0);

        // external slowdown is not overridden by the already-started act
        p.states.get_mut(&id).unwrap().speed = 1.0;
        p.step(&m, 1.0);
        assert_eq!(p.states.get(&id).unwrap().speed, 1.0);
    }

    #[test]
    fn reach_position_trigger_fires_after_movement() {
        let (mut m, id) = model_with_actor(10.0);
        m.story.acts.push(Act {
            name: "arrive".to_string(),
            start: Trigger {
                rule: TriggerRule::Any,
                conditions: vec![Condition::ReachPosition {
                    actor: id,
                    position: Position::world(10.0, 0.0, 0.0),
                    tolerance: 1.0,
                }],
            },
            actions: vec![Action::SetSpeed { actor: id, speed: 0.0 }],
        });

        let mut p = Playback::from_model(&m);
        for _ in 0..10 { p.step(&m, 0.1); }
        assert_eq!(p.states.get(&id).unwrap().speed, 0.0);
    }
}
