use nalgebra_glm as glm;
use std::collections::HashMap;

use crate::document::model::*;

// Curvatures below this are drawn as straight lines.
const CURVATURE_EPS :f32 = 1e-6;

/// Geometry derived from the model for drawing and picking. Recomputed
/// in the background after every model edit.
#[derive(Debug, Default, Clone)]
pub struct RenderGeometry {
    pub centerlines :HashMap<RoadId, Vec<PtC>>,
    pub junction_outlines :HashMap<JunctionId, Vec<PtC>>,
}

/// Evaluate the reference line at spline parameter `s`, returning the
/// world point and the heading there.
pub fn point_at(geometry :&[Geometry], s :f32) -> Option<(PtC, f32)> {
    let g = geometry.iter().rev()
        .find(|g| g.s <= s && s <= g.s + g.length)?;
    let ds = s - g.s;
    match g.kind {
        GeometryKind::Line => {
            let dir = glm::vec2(g.hdg.cos(), g.hdg.sin());
            Some((g.start_point() + dir * ds, g.hdg))
        },
        GeometryKind::Arc { curvature } if curvature.abs() < CURVATURE_EPS => {
            let dir = glm::vec2(g.hdg.cos(), g.hdg.sin());
            Some((g.start_point() + dir * ds, g.hdg))
        },
        GeometryKind::Arc { curvature } => {
            let hdg = g.hdg + curvature * ds;
            let x = g.x + (hdg.sin() - g.hdg.sin()) / curvature;
            let y = g.y - (hdg.cos() - g.hdg.cos()) / curvature;
            Some((glm::vec2(x, y), hdg))
        },
    }
}

/// Sample the reference line with the given step, always including the
/// end point.
pub fn sample_centerline(geometry :&[Geometry], step :f32) -> Vec<PtC> {
    let total :f32 = geometry.iter().map(|g| g.length).sum();
    if total <= 0.0 { return Vec::new(); }
    let step = step.max(1e-3);
    let n = (total / step).ceil() as usize;
    let mut pts = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let s = (i as f32 * step).min(total);
        if let Some((p, _)) = point_at(geometry, s) {
            pts.push(p);
        }
    }
    pts
}

pub fn compute(model :&Model, step :f32) -> RenderGeometry {
    let mut out = RenderGeometry::default();
    for (id, road) in model.roads.iter() {
        let geometry :Vec<Geometry> = road.geometry().cloned().collect();
        out.centerlines.insert(*id, sample_centerline(&geometry, step));
    }
    for (id, junction) in model.junctions.iter() {
        let mut pts = Vec::new();
        for conn in junction.connections.iter() {
            if let Some(line) = out.centerlines.get(&conn.connecting) {
                pts.extend(line.iter().cloned());
            }
        }
        if !pts.is_empty() {
            let (mut lo, mut hi) = (pts[0], pts[0]);
            for p in pts.iter() {
                lo = glm::vec2(lo.x.min(p.x), lo.y.min(p.y));
                hi = glm::vec2(hi.x.max(p.x), hi.y.max(p.y));
            }
            out.junction_outlines.insert(*id,
                vec![lo, glm::vec2(hi.x, lo.y), hi, glm::vec2(lo.x, hi.y)]);
        }
    }
    out
}
