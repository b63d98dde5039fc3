// 切片、標籤、引線三個群組都以類別名稱為 key
use crate::domain::model::{ChartSeries, Datum};
use crate::render::pie::{fmt, pie_layout, ArcAngles, ArcShape, ArcTween, PieSlice};
use crate::render::surface::Document;
use crate::render::{ChartRenderer, DrawOutcome, RendererKind};
use crate::utils::error::{BudgetError, Result};
use quick_xml::escape::escape;
use rand::Rng;
use std::time::Duration;

pub type NodeId = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieGeometry {
    pub width: f64,
    pub height: f64,
    pub radius: f64,
}

impl PieGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (f64::from(width), f64::from(height));
        Self {
            width,
            height,
            radius: width.min(height) / 2.0,
        }
    }

    pub fn slice_arc(&self) -> ArcShape {
        ArcShape::new(self.radius * 0.4, self.radius * 0.8)
    }

    pub fn outer_arc(&self) -> ArcShape {
        ArcShape::new(self.radius * 0.9, self.radius * 0.9)
    }

    fn side(angles: &ArcAngles) -> f64 {
        if angles.is_right_half() {
            1.0
        } else {
            -1.0
        }
    }

    /// Label anchor point: on the outer arc, pushed out to `±radius`.
    pub fn label_position(&self, angles: &ArcAngles) -> (f64, f64) {
        let (_, y) = self.outer_arc().centroid(angles);
        (self.radius * Self::side(angles), y)
    }

    pub fn text_anchor(angles: &ArcAngles) -> &'static str {
        if angles.is_right_half() {
            "start"
        } else {
            "end"
        }
    }

    /// Wedge centroid → outer arc → beside the label.
    pub fn leader_points(&self, angles: &ArcAngles) -> [(f64, f64); 3] {
        let (ox, oy) = self.outer_arc().centroid(angles);
        [
            self.slice_arc().centroid(angles),
            (ox, oy),
            (self.radius * 0.95 * Self::side(angles), oy),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyedNode {
    pub id: NodeId,
    pub key: String,
    pub fill: Option<String>,
    tween: ArcTween,
}

impl KeyedNode {
    pub fn angles(&self) -> ArcAngles {
        self.tween.current()
    }

    pub fn target(&self) -> ArcAngles {
        self.tween.target()
    }

    pub fn is_animating(&self) -> bool {
        !self.tween.is_finished()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

impl JoinStats {
    fn total(&self) -> u64 {
        (self.entered + self.updated + self.exited) as u64
    }

    fn merge(self, other: JoinStats) -> JoinStats {
        JoinStats {
            entered: self.entered + other.entered,
            updated: self.updated + other.updated,
            exited: self.exited + other.exited,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    class: &'static str,
    nodes: Vec<KeyedNode>,
}

impl Group {
    fn new(class: &'static str) -> Self {
        Self {
            class,
            nodes: Vec::new(),
        }
    }

    pub fn class(&self) -> &str {
        self.class
    }

    pub fn nodes(&self) -> &[KeyedNode] {
        &self.nodes
    }

    pub fn get(&self, key: &str) -> Option<&KeyedNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.key.as_str()).collect()
    }

    fn join(
        &mut self,
        layout: &[PieSlice],
        colors: Option<&[String]>,
        duration: Duration,
        next_id: &mut NodeId,
    ) -> JoinStats {
        let mut stats = JoinStats::default();

        // exit
        let before = self.nodes.len();
        self.nodes
            .retain(|node| layout.iter().any(|slice| slice.label == node.key));
        stats.exited = before - self.nodes.len();

        let mut previous = std::mem::take(&mut self.nodes);
        for slice in layout {
            let fill = colors.and_then(|c| c.get(slice.index).cloned());
            match previous.iter().position(|n| n.key == slice.label) {
                // update
                Some(pos) => {
                    let mut node = previous.swap_remove(pos);
                    node.tween.retarget(slice.angles);
                    node.fill = fill;
                    self.nodes.push(node);
                    stats.updated += 1;
                }
                // enter
                None => {
                    self.nodes.push(KeyedNode {
                        id: *next_id,
                        key: slice.label.clone(),
                        fill,
                        tween: ArcTween::settled(slice.angles, duration),
                    });
                    *next_id += 1;
                    stats.entered += 1;
                }
            }
        }
        // 重複標題減少時，多出來的節點也算移除
        stats.exited += previous.len();
        stats
    }

    fn advance(&mut self, dt: Duration) -> u64 {
        let mut touched = 0;
        for node in self.nodes.iter_mut().filter(|n| n.is_animating()) {
            node.tween.advance(dt);
            touched += 1;
        }
        touched
    }

    fn is_settled(&self) -> bool {
        self.nodes.iter().all(|n| !n.is_animating())
    }
}

/// The chart bound into an SVG container.
#[derive(Debug, Clone, PartialEq)]
pub struct PieScene {
    geometry: PieGeometry,
    duration: Duration,
    slices: Group,
    labels: Group,
    lines: Group,
    data: Vec<Datum>,
    colors: Vec<String>,
    next_id: NodeId,
}

impl PieScene {
    pub fn new(width: u32, height: u32, duration: Duration) -> Self {
        Self {
            geometry: PieGeometry::new(width, height),
            duration,
            slices: Group::new("slices"),
            labels: Group::new("labels"),
            lines: Group::new("lines"),
            data: Vec::new(),
            colors: Vec::new(),
            next_id: 1,
        }
    }

    pub fn geometry(&self) -> &PieGeometry {
        &self.geometry
    }

    pub fn slices(&self) -> &Group {
        &self.slices
    }

    pub fn labels(&self) -> &Group {
        &self.labels
    }

    pub fn lines(&self) -> &Group {
        &self.lines
    }

    /// Dataset currently bound.
    pub fn data(&self) -> &[Datum] {
        &self.data
    }

    /// Binds `data` to all three groups.
    pub fn update(&mut self, data: Vec<Datum>, colors: Vec<String>) -> JoinStats {
        let layout = pie_layout(&data);
        let duration = self.duration;

        let stats = self
            .slices
            .join(&layout, Some(colors.as_slice()), duration, &mut self.next_id)
            .merge(self.labels.join(&layout, None, duration, &mut self.next_id))
            .merge(self.lines.join(&layout, None, duration, &mut self.next_id));

        self.data = data;
        self.colors = colors;
        stats
    }

    pub(crate) fn advance(&mut self, dt: Duration) -> u64 {
        self.slices.advance(dt) + self.labels.advance(dt) + self.lines.advance(dt)
    }

    pub fn is_settled(&self) -> bool {
        self.slices.is_settled() && self.labels.is_settled() && self.lines.is_settled()
    }

    pub(crate) fn write_svg(&self, out: &mut String) {
        let geometry = &self.geometry;
        let slice_arc = geometry.slice_arc();

        out.push_str(&format!(
            r#"<g transform="translate({},{})">"#,
            fmt(geometry.width / 2.0),
            fmt(geometry.height / 2.0)
        ));

        out.push_str(&format!(r#"<g class="{}">"#, self.slices.class));
        for node in &self.slices.nodes {
            out.push_str(&format!(
                r#"<path class="slice" data-key="{}" fill="{}" d="{}"/>"#,
                escape(node.key.as_str()),
                escape(node.fill.as_deref().unwrap_or("none")),
                slice_arc.path(&node.angles())
            ));
        }
        out.push_str("</g>");

        out.push_str(&format!(r#"<g class="{}">"#, self.labels.class));
        for node in &self.labels.nodes {
            let angles = node.angles();
            let (x, y) = geometry.label_position(&angles);
            out.push_str(&format!(
                r#"<text data-key="{}" dy=".35em" transform="translate({},{})" text-anchor="{}">{}</text>"#,
                escape(node.key.as_str()),
                fmt(x),
                fmt(y),
                PieGeometry::text_anchor(&angles),
                escape(node.key.as_str())
            ));
        }
        out.push_str("</g>");

        out.push_str(&format!(r#"<g class="{}">"#, self.lines.class));
        for node in &self.lines.nodes {
            let points = geometry
                .leader_points(&node.angles())
                .iter()
                .map(|(x, y)| format!("{},{}", fmt(*x), fmt(*y)))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!(
                r#"<polyline data-key="{}" points="{}"/>"#,
                escape(node.key.as_str()),
                points
            ));
        }
        out.push_str("</g></g>");
    }
}

/// Draws the budget into an SVG container with keyed transitions.
pub struct DeclarativeRenderer {
    container_id: String,
    duration: Duration,
}

impl DeclarativeRenderer {
    pub fn new(container_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            container_id: container_id.into(),
            duration,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    fn bind(&self, doc: &mut Document, data: Vec<Datum>, colors: Vec<String>) -> Result<JoinStats> {
        let duration = self.duration;
        let container = doc.container_mut(&self.container_id).ok_or_else(|| {
            BudgetError::RenderTargetMissing {
                kind: "svg container",
                id: self.container_id.clone(),
            }
        })?;

        let scene = container.scene_or_insert_with(|w, h| PieScene::new(w, h, duration));
        let stats = scene.update(data, colors);
        container.record_mutations(stats.total());
        Ok(stats)
    }

    /// Scales each displayed value by an independent factor in `[0, 1)` and
    /// rebinds. Returns the new dataset, empty when nothing is drawn yet.
    pub fn randomize<R: Rng>(&mut self, doc: &mut Document, rng: &mut R) -> Result<Vec<Datum>> {
        if !doc.is_browser() {
            return Ok(Vec::new());
        }

        let (data, colors) = match doc
            .container(&self.container_id)
            .and_then(|c| c.scene())
        {
            Some(scene) if !scene.data().is_empty() => {
                let data: Vec<Datum> = scene
                    .data()
                    .iter()
                    .map(|d| Datum {
                        label: d.label.clone(),
                        value: d.value * rng.random::<f64>(),
                    })
                    .collect();
                (data, scene.colors.clone())
            }
            _ => return Ok(Vec::new()),
        };

        let stats = self.bind(doc, data.clone(), colors)?;
        tracing::debug!(
            "Randomized {} categories (updated {})",
            data.len(),
            stats.updated
        );
        Ok(data)
    }
}

impl ChartRenderer for DeclarativeRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Declarative
    }

    fn draw(&mut self, series: &ChartSeries, doc: &mut Document) -> Result<DrawOutcome> {
        if !doc.is_browser() {
            tracing::debug!("Not running in a browser environment, skipping SVG chart");
            return Ok(DrawOutcome::Skipped);
        }
        if series.is_empty() {
            return Ok(DrawOutcome::Skipped);
        }

        let stats = self.bind(doc, series.data(), series.colors.clone())?;
        tracing::debug!(
            "SVG chart bound: {} entered, {} updated, {} exited",
            stats.entered,
            stats.updated,
            stats.exited
        );
        Ok(DrawOutcome::Drawn)
    }

    fn teardown(&mut self, doc: &mut Document) {
        if let Some(container) = doc.container_mut(&self.container_id) {
            container.clear();
        }
    }

    fn as_declarative_mut(&mut self) -> Option<&mut DeclarativeRenderer> {
        Some(self)
    }
}
