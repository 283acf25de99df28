//! Visualization utilities for store_navigation
//!
//! Layers are collected first and drawn into one gnuplot axes on save.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{ObstacleRect, Path2D, Point2D, Rect};
use crate::mission_planning::{AnnotatedPoint, Instruction};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const KEEP_OUT: &str = GRAY;
    pub const START: &str = GREEN;
    pub const ARRIVAL: &str = BLUE;
    pub const TURN: &str = ORANGE;
    pub const PATH: &str = RED;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::PATH, "Route")
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Main visualizer struct
pub struct Visualizer {
    layers: Vec<Layer>,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    /// Create a new visualizer
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            title: String::new(),
            x_label: "X".to_string(),
            y_label: "Y".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Plot a path
    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.layers.push(Layer::Lines {
            x: path.x_coords(),
            y: path.y_coords(),
            style: style.clone(),
        });
        self
    }

    /// Plot multiple points
    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        if points.is_empty() {
            return self;
        }
        self.layers.push(Layer::Points {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            style: style.clone(),
        });
        self
    }

    /// Outline each rectangle; only the first one carries the caption
    pub fn plot_rects(&mut self, rects: &[Rect], style: &PathStyle) -> &mut Self {
        for (i, rect) in rects.iter().enumerate() {
            let mut style = style.clone();
            if i > 0 {
                style.caption.clear();
            }
            self.plot_path(&Path2D::from_points(rect.outline()), &style);
        }
        self
    }

    pub fn plot_obstacles(&mut self, obstacles: &[ObstacleRect]) -> &mut Self {
        let rects: Vec<Rect> = obstacles.iter().map(|o| o.rect).collect();
        self.plot_rects(&rects, &PathStyle::new(colors::OBSTACLE, "Sections").with_line_width(1.0))
    }

    pub fn plot_keep_out_zones(&mut self, zones: &[Rect]) -> &mut Self {
        self.plot_rects(zones, &PathStyle::new(colors::KEEP_OUT, "Keep-out").with_line_width(1.0))
    }

    pub fn plot_start(&mut self, point: Point2D) -> &mut Self {
        self.plot_points(&[point], &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    /// Route polyline with turn and arrival markers
    pub fn plot_route(&mut self, route: &[AnnotatedPoint]) -> &mut Self {
        let path = Path2D::from_points(route.iter().map(|p| p.position()).collect());
        self.plot_path(&path, &PathStyle::default());

        let marked = |wanted: fn(&Instruction) -> bool| -> Vec<Point2D> {
            route
                .iter()
                .filter(|p| p.instruction.as_ref().is_some_and(wanted))
                .map(|p| p.position())
                .collect()
        };
        let turns = marked(|i| matches!(i, Instruction::TurnLeft | Instruction::TurnRight));
        let arrivals = marked(|i| matches!(i, Instruction::Arrive));

        self.plot_points(&turns, &PointStyle::new(colors::TURN, "Turns").with_symbol('x'));
        self.plot_points(
            &arrivals,
            &PointStyle::new(colors::ARRIVAL, "Arrivals").with_size(1.5).with_symbol('S'),
        );
        self
    }

    /// Save plot to PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    /// Save plot to SVG file
    pub fn save_svg(&self, path: &str) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_svg(path, 800, 600).map_err(|e| e.to_string())
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();

        for layer in &self.layers {
            match layer {
                Layer::Lines { x, y, style } => {
                    axes.lines(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        LineWidth(style.line_width),
                    ]);
                }
                Layer::Points { x, y, style } => {
                    axes.points(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visualizer_creation() {
        let vis = Visualizer::new();
        assert!(vis.aspect_ratio.is_some());
        assert_eq!(vis.layer_count(), 0);
    }

    #[test]
    fn test_path_style() {
        let style = PathStyle::new(colors::RED, "Test Path").with_line_width(3.0);
        assert_eq!(style.line_width, 3.0);
        assert_eq!(style.color, colors::RED);
    }

    #[test]
    fn test_route_layers() {
        let route = vec![
            AnnotatedPoint { x: 0.0, y: 0.0, section_id: None, instruction: None },
            AnnotatedPoint { x: 1.0, y: 0.0, section_id: None, instruction: Some(Instruction::TurnLeft) },
            AnnotatedPoint { x: 1.0, y: 1.0, section_id: Some(3), instruction: Some(Instruction::Arrive) },
        ];
        let mut vis = Visualizer::new();
        vis.plot_obstacles(&[ObstacleRect::new(1, 2.0, 0.0, 3.0, 2.0), ObstacleRect::new(2, 0.0, 2.0, 1.0, 3.0)])
            .plot_start(Point2D::origin())
            .plot_route(&route);
        // 2 outlines, start, route line, turns, arrivals
        assert_eq!(vis.layer_count(), 6);
    }
}
