use crate::document::model::PtC;
use nalgebra_glm as glm;

pub fn in_rect(pt :PtC, a :PtC, b :PtC) -> bool {
    let (x_lo,x_hi) = (a.x.min(b.x), a.x.max(b.x));
    let (y_lo,y_hi) = (a.y.min(b.y), a.y.max(b.y));
    x_lo <= pt.x && pt.x <= x_hi && y_lo <= pt.y && pt.y <= y_hi
}

pub fn project_to_line(p :PtC, a :PtC, b :PtC) -> (PtC,f32) {
    let t = glm::clamp_scalar(glm::dot(&(p-a),&(b-a)) / glm::distance2(&a,&b), 0.0, 1.0);
    (glm::lerp(&a,&b,t), t)
}

pub fn dist_to_line_sqr(p0 :PtC, a :PtC, b :PtC) -> (f32,f32) {
    let (p,param) = project_to_line(p0,a,b);
    (glm::length2(&(p - p0)), param)
}
