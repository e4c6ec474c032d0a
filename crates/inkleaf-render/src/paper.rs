//! Procedural paper patterns.

use crate::renderer::{RenderContext, argb_color};
use crate::scene::SceneOp;
use inkleaf_core::model::PaperStyle;
use kurbo::Point;

/// Positions `spacing, 2*spacing, ...` strictly below `limit`.
fn steps(spacing: f64, limit: f64) -> impl Iterator<Item = f64> {
    (1u32..).map(move |i| i as f64 * spacing).take_while(move |v| *v < limit)
}

/// Draw ops of the paper pattern for `style` at the size of `ctx`.
pub fn paper_ops(style: PaperStyle, ctx: &RenderContext<'_>) -> Vec<SceneOp> {
    let config = ctx.config;
    let spacing = ctx.dp(config.paper_spacing_dp);
    if spacing <= 0.0 {
        return Vec::new();
    }
    let (width, height) = (ctx.width as f64, ctx.height as f64);
    let color = argb_color(config.soft_color);
    let line_width = ctx.dp(config.paper_line_width_dp);
    let horizontal = |y: f64| SceneOp::Line {
        from: Point::new(0.0, y),
        to: Point::new(width, y),
        width: line_width,
        color,
    };
    let vertical = |x: f64| SceneOp::Line {
        from: Point::new(x, 0.0),
        to: Point::new(x, height),
        width: line_width,
        color,
    };

    match style {
        PaperStyle::Blank => Vec::new(),
        PaperStyle::Lined => {
            let mut ops: Vec<SceneOp> = steps(spacing, height).map(horizontal).collect();
            let margin = ctx.dp(config.paper_margin_dp);
            ops.push(SceneOp::Line {
                from: Point::new(margin, 0.0),
                to: Point::new(margin, height),
                width: ctx.dp(config.margin_line_width_dp),
                color: argb_color(config.margin_color),
            });
            ops
        }
        PaperStyle::Grid => steps(spacing, width).map(vertical).chain(steps(spacing, height).map(horizontal)).collect(),
        PaperStyle::Dot => {
            let radius = ctx.dp(config.dot_radius_dp);
            steps(spacing, width)
                .flat_map(|x| steps(spacing, height).map(move |y| SceneOp::Dot { center: Point::new(x, y), radius, color }))
                .collect()
        }
    }
}
