use glam::{Vec2, Vec4};
use kurbo::{Affine, BezPath};
use lottie_core::effects::FillEffect;
use lottie_core::layer::{ImageRef, Layer};
use lottie_core::modifiers::{Composite, Repeater};
use lottie_core::node::{Group, Node};
use lottie_core::paint::{DashPattern, Fill, FillRule, GradientFill, GradientKind, LineCap, LineJoin, Stroke};
use lottie_core::shapes::{Ellipse, FreeForm, Rect, Round, ShapePath};
use lottie_core::transform::{ShapeTransform, Transform};
use lottie_core::trim::TrimWindow;
use lottie_core::{Renderer, Snapshot, TrimStack, TrimmingState};
use std::fmt::Write as _;
use tracing::trace;

/// Renders one frame snapshot to a standalone SVG document.
pub fn render_svg(snapshot: &Snapshot) -> String {
    let mut renderer = SvgRenderer::new();
    snapshot.render(&mut renderer);
    let info = snapshot.info();
    renderer.into_document(info.width, info.height)
}

#[derive(Debug, Clone, PartialEq)]
enum SvgPaint {
    Fill {
        color: Vec4,
        opacity: f32,
        rule: FillRule,
    },
    Gradient {
        id: String,
        opacity: f32,
        rule: FillRule,
    },
    Stroke {
        color: Vec4,
        opacity: f32,
        width: f32,
        cap: LineCap,
        join: LineJoin,
        miter_limit: f32,
        dash: Option<DashPattern>,
    },
}

impl SvgPaint {
    /// Stroke geometry scaled for drawing in document space.
    fn scaled(&self, scale: f32) -> SvgPaint {
        let mut paint = self.clone();
        if let SvgPaint::Stroke { width, dash, .. } = &mut paint {
            *width *= scale;
            if let Some(dash) = dash {
                dash.array.iter_mut().for_each(|v| *v *= scale);
                dash.offset *= scale;
            }
        }
        paint
    }
}

/// A shape held back for a simultaneous trim, in document space, with the
/// paints that were current when it was drawn.
#[derive(Debug, Clone)]
struct PendingShape {
    path: BezPath,
    opacity: f32,
    paints: Vec<SvgPaint>,
    fill_override: Option<Vec4>,
}

impl PendingShape {
    fn same_style(&self, other: &PendingShape) -> bool {
        self.opacity == other.opacity && self.paints == other.paints && self.fill_override == other.fill_override
    }
}

#[derive(Debug, Clone)]
struct State {
    transform: Affine,
    opacity: f32,
    paints: Vec<SvgPaint>,
    /// Copies produced by a repeater: transform and opacity per instance.
    instances: Option<Vec<(Affine, f32)>>,
    fill_override: Option<Vec4>,
    /// Number of pending shapes queued before this container started.
    pending_mark: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            opacity: 1.0,
            paints: Vec::new(),
            instances: None,
            fill_override: None,
            pending_mark: 0,
        }
    }
}

/// Writes the shapes of a frame as SVG `<path>` elements.
///
/// Paints reach the renderer before the shapes they cover, so they are
/// collected in the current state and applied to every shape drawn after
/// them within the same container.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    state: State,
    saved: Vec<State>,
    trim_stack: TrimStack,
    defs: String,
    body: String,
    gradient_count: usize,
    /// Shapes awaiting a simultaneous trim, in draw order.
    pending: Vec<PendingShape>,
    pending_image: Option<ImageRef>,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body markup written so far.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_document(self, width: u32, height: u32) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height
        );
        if !self.defs.is_empty() {
            out.push_str("<defs>\n");
            out.push_str(&self.defs);
            out.push_str("</defs>\n");
        }
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }

    fn draw_shape(&mut self, node: &Node, shape: &ShapePath) {
        let path = shape.path();
        if path.elements().is_empty() {
            return;
        }
        if self.trimming_state() == TrimmingState::Simultaneous {
            self.queue_trimmed(path);
            return;
        }
        trace!(node = %node.name, "svg path");
        let d = path.to_svg();
        let single = [(Affine::IDENTITY, 1.0)];
        let instances = self.state.instances.as_deref().unwrap_or(&single);
        for (instance, instance_opacity) in instances {
            let transform = self.state.transform * *instance;
            let opacity = self.state.opacity * instance_opacity;
            for paint in &self.state.paints {
                write_path(&mut self.body, &d, transform, opacity, paint, self.state.fill_override);
            }
        }
    }

    fn queue_trimmed(&mut self, path: &BezPath) {
        let instances = self
            .state
            .instances
            .clone()
            .unwrap_or_else(|| vec![(Affine::IDENTITY, 1.0)]);
        for (instance, instance_opacity) in instances {
            let transform = self.state.transform * instance;
            let mut placed = path.clone();
            placed.apply_affine(transform);
            let scale = transform.determinant().abs().sqrt() as f32;
            let shape = PendingShape {
                path: placed,
                opacity: self.state.opacity * instance_opacity,
                paints: self.state.paints.iter().map(|p| p.scaled(scale)).collect(),
                fill_override: self.state.fill_override,
            };
            // Consecutive shapes with one style are drawn as one element.
            let mergeable = self.pending.len() > self.state.pending_mark;
            match self.pending.last_mut() {
                Some(last) if mergeable && last.same_style(&shape) => {
                    last.path.extend(shape.path.elements().iter().copied());
                }
                _ => self.pending.push(shape),
            }
        }
    }
}

fn sanitize(v: f64) -> f64 {
    // Also folds negative zero, which would print as "-0".
    if v.is_finite() && v != 0.0 {
        v
    } else {
        0.0
    }
}

fn svg_color(c: Vec4) -> String {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("rgb({},{},{})", channel(c.x), channel(c.y), channel(c.z))
}

fn svg_matrix(a: Affine) -> String {
    let c = a.as_coeffs();
    format!(
        "matrix({} {} {} {} {} {})",
        sanitize(c[0]),
        sanitize(c[1]),
        sanitize(c[2]),
        sanitize(c[3]),
        sanitize(c[4]),
        sanitize(c[5])
    )
}

fn convert_fill_rule(rule: FillRule) -> &'static str {
    match rule {
        FillRule::NonZero => "nonzero",
        FillRule::EvenOdd => "evenodd",
    }
}

fn convert_cap(cap: LineCap) -> &'static str {
    match cap {
        LineCap::Butt => "butt",
        LineCap::Round => "round",
        LineCap::Square => "square",
    }
}

fn convert_join(join: LineJoin) -> &'static str {
    match join {
        LineJoin::Miter => "miter",
        LineJoin::Round => "round",
        LineJoin::Bevel => "bevel",
    }
}

fn write_path(out: &mut String, d: &str, transform: Affine, opacity: f32, paint: &SvgPaint, fill_override: Option<Vec4>) {
    let _ = write!(out, r#"<path d="{}""#, d);
    if transform != Affine::IDENTITY {
        let _ = write!(out, r#" transform="{}""#, svg_matrix(transform));
    }
    match paint {
        SvgPaint::Fill {
            color,
            opacity: paint_opacity,
            rule,
        } => {
            let color = fill_override.unwrap_or(*color);
            let _ = write!(
                out,
                r#" fill="{}" fill-opacity="{}" fill-rule="{}""#,
                svg_color(color),
                color.w * paint_opacity * opacity,
                convert_fill_rule(*rule)
            );
        }
        SvgPaint::Gradient {
            id,
            opacity: paint_opacity,
            rule,
        } => {
            let _ = write!(
                out,
                r#" fill="url(#{})" fill-opacity="{}" fill-rule="{}""#,
                id,
                paint_opacity * opacity,
                convert_fill_rule(*rule)
            );
        }
        SvgPaint::Stroke {
            color,
            opacity: paint_opacity,
            width,
            cap,
            join,
            miter_limit,
            dash,
        } => {
            let _ = write!(
                out,
                r#" fill="none" stroke="{}" stroke-opacity="{}" stroke-width="{}" stroke-linecap="{}" stroke-linejoin="{}" stroke-miterlimit="{}""#,
                svg_color(*color),
                color.w * paint_opacity * opacity,
                width,
                convert_cap(*cap),
                convert_join(*join),
                miter_limit
            );
            if let Some(dash) = dash {
                let array: Vec<String> = dash.array.iter().map(|v| v.to_string()).collect();
                let _ = write!(
                    out,
                    r#" stroke-dasharray="{}" stroke-dashoffset="{}""#,
                    array.join(" "),
                    dash.offset
                );
            }
        }
    }
    out.push_str("/>\n");
}

fn write_gradient(out: &mut String, id: &str, gradient: &GradientFill) {
    let start = gradient.start_point();
    let end = gradient.end_point();
    match gradient.kind() {
        GradientKind::Linear => {
            let _ = writeln!(
                out,
                r#"<linearGradient id="{}" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}">"#,
                id, start.x, start.y, end.x, end.y
            );
        }
        GradientKind::Radial => {
            let radius = start.distance(end);
            // The highlight moves the focal point along the highlight angle,
            // measured from the start-to-end axis.
            let delta = end - start;
            let angle = delta.y.atan2(delta.x) + gradient.highlight_angle().to_radians();
            let length = radius * (gradient.highlight_length() / 100.0).clamp(-0.99, 0.99);
            let focal = start + Vec2::new(angle.cos(), angle.sin()) * length;
            let _ = writeln!(
                out,
                r#"<radialGradient id="{}" gradientUnits="userSpaceOnUse" cx="{}" cy="{}" r="{}" fx="{}" fy="{}">"#,
                id, start.x, start.y, radius, focal.x, focal.y
            );
        }
    }
    for stop in gradient.stops() {
        let _ = writeln!(
            out,
            r#"<stop offset="{}" stop-color="{}" stop-opacity="{}"/>"#,
            stop.offset,
            svg_color(stop.color),
            stop.color.w
        );
    }
    out.push_str(match gradient.kind() {
        GradientKind::Linear => "</linearGradient>\n",
        GradientKind::Radial => "</radialGradient>\n",
    });
}

impl Renderer for SvgRenderer {
    fn save_state(&mut self) {
        self.saved.push(self.state.clone());
        self.state.pending_mark = self.pending.len();
    }

    fn restore_state(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn trim_stack(&self) -> &TrimStack {
        &self.trim_stack
    }

    fn trim_stack_mut(&mut self) -> &mut TrimStack {
        &mut self.trim_stack
    }

    fn render_layer(&mut self, _node: &Node, _layer: &Layer) {}

    fn render_image_layer(&mut self, _node: &Node, _layer: &Layer, image: &ImageRef) {
        self.pending_image = Some(image.clone());
    }

    fn render_group(&mut self, _node: &Node, _group: &Group) {}

    fn render_transform(&mut self, _node: &Node, transform: &Transform) {
        self.state.transform = self.state.transform * transform.matrix();
        self.state.opacity *= transform.opacity();
        if let Some(image) = self.pending_image.take() {
            let _ = writeln!(
                self.body,
                r#"<image xlink:href="{}" width="{}" height="{}" transform="{}" opacity="{}"/>"#,
                image.asset_id,
                image.width,
                image.height,
                svg_matrix(self.state.transform),
                self.state.opacity
            );
        }
    }

    fn render_parent_transform(&mut self, _node: &Node, transform: &Transform) {
        self.state.transform = self.state.transform * transform.matrix();
    }

    fn render_shape_transform(&mut self, _node: &Node, transform: &ShapeTransform) {
        self.state.transform = self.state.transform * transform.matrix();
        self.state.opacity *= transform.opacity();
    }

    fn render_rect(&mut self, node: &Node, rect: &Rect) {
        self.draw_shape(node, rect.shape());
    }

    fn render_ellipse(&mut self, node: &Node, ellipse: &Ellipse) {
        self.draw_shape(node, ellipse.shape());
    }

    fn render_round(&mut self, node: &Node, round: &Round) {
        self.draw_shape(node, round.shape());
    }

    fn render_free_form(&mut self, node: &Node, free_form: &FreeForm) {
        self.draw_shape(node, free_form.shape());
    }

    fn render_fill(&mut self, _node: &Node, fill: &Fill) {
        self.state.paints.push(SvgPaint::Fill {
            color: fill.color(),
            opacity: fill.opacity(),
            rule: fill.fill_rule(),
        });
    }

    fn render_gradient_fill(&mut self, _node: &Node, gradient: &GradientFill) {
        let id = format!("gradient-{}", self.gradient_count);
        self.gradient_count += 1;
        write_gradient(&mut self.defs, &id, gradient);
        self.state.paints.push(SvgPaint::Gradient {
            id,
            opacity: gradient.opacity(),
            rule: gradient.fill_rule(),
        });
    }

    fn render_stroke(&mut self, _node: &Node, stroke: &Stroke) {
        self.state.paints.push(SvgPaint::Stroke {
            color: stroke.color(),
            opacity: stroke.opacity(),
            width: stroke.width(),
            cap: stroke.cap(),
            join: stroke.join(),
            miter_limit: stroke.miter_limit(),
            dash: stroke.dash_pattern(),
        });
    }

    fn render_trim(&mut self, node: &Node, window: &TrimWindow) {
        let mark = self.state.pending_mark.min(self.pending.len());
        let queued = self.pending.split_off(mark);
        let paths: Vec<BezPath> = queued.iter().map(|shape| shape.path.clone()).collect();
        trace!(node = %node.name, shapes = queued.len(), "svg trim");
        for (shape, trimmed) in queued.iter().zip(window.trim_each(&paths)) {
            if trimmed.elements().is_empty() {
                continue;
            }
            let d = trimmed.to_svg();
            for paint in &shape.paints {
                write_path(&mut self.body, &d, Affine::IDENTITY, shape.opacity, paint, shape.fill_override);
            }
        }
    }

    fn render_repeater(&mut self, _node: &Node, repeater: &Repeater) {
        let mut instances: Vec<(Affine, f32)> = (0..repeater.copies())
            .map(|i| (repeater.instance_transform(i), repeater.instance_opacity(i)))
            .collect();
        if repeater.composite() == Composite::Below {
            instances.reverse();
        }
        self.state.instances = Some(instances);
    }

    fn render_fill_effect(&mut self, _node: &Node, effect: &FillEffect) {
        let mut color = effect.color();
        color.w *= effect.opacity();
        self.state.fill_override = Some(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_color() {
        assert_eq!(svg_color(Vec4::new(1.0, 0.0, 0.5, 1.0)), "rgb(255,0,128)");
        assert_eq!(svg_color(Vec4::new(2.0, -1.0, 0.0, 1.0)), "rgb(255,0,0)");
    }

    #[test]
    fn test_svg_matrix() {
        let m = Affine::translate((10.0, 20.0));
        assert_eq!(svg_matrix(m), "matrix(1 0 0 1 10 20)");
        assert_eq!(sanitize(f64::NAN), 0.0);
        assert_eq!(format!("{}", sanitize(-0.0)), "0");
    }

    #[test]
    fn test_empty_document() {
        let doc = SvgRenderer::new().into_document(64, 32);
        assert!(doc.starts_with("<svg"));
        assert!(doc.contains(r#"viewBox="0 0 64 32""#));
        assert!(!doc.contains("<defs>"));
        assert!(doc.trim_end().ends_with("</svg>"));
    }
}
