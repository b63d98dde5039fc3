use crate::render::declarative::PieScene;
use crate::render::pie::{fmt, ArcAngles, ArcShape};
use crate::render::retained::{DrawOp, PieChart};
use crate::utils::error::{BudgetError, Result};
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// A real rendering surface is attached.
    Browser,
    /// Server-side render pass: elements exist but nothing may be drawn.
    Server,
}

#[derive(Debug)]
pub struct Document {
    environment: Environment,
    canvases: HashMap<String, Canvas>,
    containers: HashMap<String, SvgContainer>,
}

impl Document {
    pub fn browser() -> Self {
        Self::new(Environment::Browser)
    }

    pub fn server() -> Self {
        Self::new(Environment::Server)
    }

    fn new(environment: Environment) -> Self {
        Self {
            environment,
            canvases: HashMap::new(),
            containers: HashMap::new(),
        }
    }

    pub fn with_canvas(mut self, id: &str, width: u32, height: u32) -> Self {
        self.canvases
            .insert(id.to_string(), Canvas::new(id, width, height));
        self
    }

    pub fn with_container(mut self, id: &str, width: u32, height: u32) -> Self {
        self.containers
            .insert(id.to_string(), SvgContainer::new(id, width, height));
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn is_browser(&self) -> bool {
        self.environment == Environment::Browser
    }

    pub fn canvas(&self, id: &str) -> Option<&Canvas> {
        self.canvases.get(id)
    }

    pub fn canvas_mut(&mut self, id: &str) -> Option<&mut Canvas> {
        self.canvases.get_mut(id)
    }

    pub fn container(&self, id: &str) -> Option<&SvgContainer> {
        self.containers.get(id)
    }

    pub fn container_mut(&mut self, id: &str) -> Option<&mut SvgContainer> {
        self.containers.get_mut(id)
    }

    pub fn remove_container(&mut self, id: &str) -> Option<SvgContainer> {
        self.containers.remove(id)
    }

    /// Total mutations across every element currently attached.
    pub fn mutation_count(&self) -> u64 {
        self.canvases.values().map(|c| c.mutations).sum::<u64>()
            + self.containers.values().map(|c| c.mutations).sum::<u64>()
    }

    /// Steps every running animation by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        for canvas in self.canvases.values_mut() {
            canvas.advance(dt);
        }
        for container in self.containers.values_mut() {
            container.advance(dt);
        }
    }

    pub fn is_settled(&self) -> bool {
        self.canvases.values().all(Canvas::is_settled)
            && self.containers.values().all(SvgContainer::is_settled)
    }

    /// Advances in `frame` steps until nothing is animating.
    pub fn settle(&mut self, frame: Duration) {
        let frame = frame.max(Duration::from_millis(1));
        while !self.is_settled() {
            self.advance(frame);
        }
    }
}

/// A canvas element. At most one chart object may be bound to it at a time.
#[derive(Debug)]
pub struct Canvas {
    id: String,
    width: u32,
    height: u32,
    chart: Option<PieChart>,
    frame: Vec<DrawOp>,
    mutations: u64,
}

impl Canvas {
    fn new(id: &str, width: u32, height: u32) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            chart: None,
            frame: Vec::new(),
            mutations: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn chart(&self) -> Option<&PieChart> {
        self.chart.as_ref()
    }

    pub fn frame(&self) -> &[DrawOp] {
        &self.frame
    }

    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Binds `chart` and paints its first frame.
    pub fn attach(&mut self, chart: PieChart) -> Result<()> {
        if self.chart.is_some() {
            return Err(BudgetError::CanvasInUse {
                id: self.id.clone(),
            });
        }
        self.chart = Some(chart);
        self.repaint();
        Ok(())
    }

    /// Unbinds and returns the current chart, clearing the bitmap.
    pub fn destroy_chart(&mut self) -> Option<PieChart> {
        let chart = self.chart.take()?;
        self.frame.clear();
        self.mutations += 1;
        Some(chart)
    }

    fn repaint(&mut self) {
        if let Some(chart) = &self.chart {
            self.frame = chart.frame(self.width, self.height);
            self.mutations += 1;
        }
    }

    fn advance(&mut self, dt: Duration) {
        let animating = match self.chart.as_mut() {
            Some(chart) if !chart.is_settled() => {
                chart.advance(dt);
                true
            }
            _ => false,
        };
        if animating {
            self.repaint();
        }
    }

    fn is_settled(&self) -> bool {
        self.chart.as_ref().map_or(true, PieChart::is_settled)
    }

    /// Vector snapshot of the current bitmap.
    pub fn to_svg(&self) -> String {
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" width="{}" height="{}">"#,
            escape(self.id.as_str()),
            self.width,
            self.height
        );
        for op in &self.frame {
            match op {
                DrawOp::Title { text, x, y } => out.push_str(&format!(
                    r#"<text class="title" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                    fmt(*x),
                    fmt(*y),
                    escape(text.as_str())
                )),
                DrawOp::LegendItem { label, color, x, y } => out.push_str(&format!(
                    r#"<rect class="legend" x="{}" y="{}" width="12" height="12" fill="{}"/><text x="{}" y="{}">{}</text>"#,
                    fmt(*x),
                    fmt(*y),
                    escape(color.as_str()),
                    fmt(*x + 16.0),
                    fmt(*y + 11.0),
                    escape(label.as_str())
                )),
                DrawOp::Wedge {
                    label,
                    color,
                    cx,
                    cy,
                    radius,
                    start,
                    end,
                } => {
                    let d = ArcShape::new(0.0, *radius).path(&ArcAngles::new(*start, *end));
                    out.push_str(&format!(
                        r##"<path class="wedge" data-label="{}" transform="translate({},{})" fill="{}" stroke="#fff" d="{}"/>"##,
                        escape(label.as_str()),
                        fmt(*cx),
                        fmt(*cy),
                        escape(color.as_str()),
                        d
                    ));
                }
            }
        }
        out.push_str("</svg>");
        out
    }
}

/// An SVG container element the declarative chart binds into.
#[derive(Debug)]
pub struct SvgContainer {
    id: String,
    width: u32,
    height: u32,
    scene: Option<PieScene>,
    mutations: u64,
}

impl SvgContainer {
    fn new(id: &str, width: u32, height: u32) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            scene: None,
            mutations: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn scene(&self) -> Option<&PieScene> {
        self.scene.as_ref()
    }

    pub(crate) fn scene_or_insert_with(
        &mut self,
        init: impl FnOnce(u32, u32) -> PieScene,
    ) -> &mut PieScene {
        let (width, height) = (self.width, self.height);
        if self.scene.is_none() {
            // 建立 svg 根節點與三個群組
            self.mutations += 4;
        }
        self.scene.get_or_insert_with(|| init(width, height))
    }

    pub(crate) fn record_mutations(&mut self, count: u64) {
        self.mutations += count;
    }

    pub fn clear(&mut self) {
        if self.scene.take().is_some() {
            self.mutations += 1;
        }
    }

    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    fn advance(&mut self, dt: Duration) {
        if let Some(scene) = self.scene.as_mut() {
            if !scene.is_settled() {
                let touched = scene.advance(dt);
                self.mutations += touched;
            }
        }
    }

    fn is_settled(&self) -> bool {
        self.scene.as_ref().map_or(true, PieScene::is_settled)
    }

    pub fn to_svg(&self) -> String {
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" width="{}" height="{}">"#,
            escape(self.id.as_str()),
            self.width,
            self.height
        );
        if let Some(scene) = &self.scene {
            scene.write_svg(&mut out);
        }
        out.push_str("</svg>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ChartSeries;
    use crate::render::retained::ChartConfig;

    fn series() -> ChartSeries {
        ChartSeries {
            values: vec![500.0, 200.0],
            labels: vec!["Rent".to_string(), "Food".to_string()],
            colors: vec!["#ffcd56".to_string(), "#ff6384".to_string()],
        }
    }

    fn chart(id: u64) -> PieChart {
        PieChart::new(
            id,
            ChartConfig::default(),
            series(),
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn test_canvas_refuses_second_chart() {
        let mut doc = Document::browser().with_canvas("myChart", 400, 400);
        let canvas = doc.canvas_mut("myChart").unwrap();

        canvas.attach(chart(1)).unwrap();
        let err = canvas.attach(chart(2)).unwrap_err();
        assert!(matches!(err, BudgetError::CanvasInUse { .. }));

        let destroyed = canvas.destroy_chart().unwrap();
        assert_eq!(destroyed.id(), 1);
        assert!(canvas.frame().is_empty());
        assert!(canvas.attach(chart(2)).is_ok());
    }

    #[test]
    fn test_canvas_animation_settles() {
        let mut doc = Document::browser().with_canvas("myChart", 400, 400);
        doc.canvas_mut("myChart").unwrap().attach(chart(1)).unwrap();
        assert!(!doc.is_settled());

        let before = doc.mutation_count();
        doc.settle(Duration::from_millis(16));
        assert!(doc.is_settled());
        assert!(doc.mutation_count() > before);

        let svg = doc.canvas("myChart").unwrap().to_svg();
        assert!(svg.contains("Personal Budget"));
        assert_eq!(svg.matches(r#"class="wedge""#).count(), 2);
    }

    #[test]
    fn test_server_document_reports_environment() {
        let doc = Document::server().with_canvas("myChart", 10, 10);
        assert!(!doc.is_browser());
        assert_eq!(doc.environment(), Environment::Server);
        assert!(doc.canvas("myChart").is_some());
        assert!(doc.canvas("other").is_none());
    }

    #[test]
    fn test_empty_container_svg() {
        let doc = Document::browser().with_container("budgetPie", 960, 450);
        let svg = doc.container("budgetPie").unwrap().to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="960""#));
        assert!(svg.ends_with("</svg>"));
    }
}
