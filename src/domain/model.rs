use serde::{Deserialize, Serialize};

/// One labeled budget category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub title: String,
    pub budget: f64,
}

impl BudgetItem {
    pub fn new(title: impl Into<String>, budget: f64) -> Self {
        Self {
            title: title.into(),
            budget,
        }
    }
}

/// Wire shape of `GET {base_url}/budget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetResponse {
    #[serde(rename = "myBudget")]
    pub my_budget: Vec<BudgetItem>,
}

impl BudgetResponse {
    /// 驗證每一筆資料：標題不可為空，金額需為非負有限數
    pub fn check(&self) -> std::result::Result<(), String> {
        for (index, item) in self.my_budget.iter().enumerate() {
            if item.title.trim().is_empty() {
                return Err(format!("item {} has an empty title", index));
            }
            if !item.budget.is_finite() || item.budget < 0.0 {
                return Err(format!(
                    "item {} ({}) has an invalid budget {}",
                    index, item.title, item.budget
                ));
            }
        }
        Ok(())
    }
}

/// `{label, value}` pair fed to the pie layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datum {
    pub label: String,
    pub value: f64,
}

/// The single projection every chart renderer consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub values: Vec<f64>,
    pub labels: Vec<String>,
    pub colors: Vec<String>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn data(&self) -> Vec<Datum> {
        self.labels
            .iter()
            .zip(&self.values)
            .map(|(label, value)| Datum {
                label: label.clone(),
                value: *value,
            })
            .collect()
    }

    pub fn color_of(&self, label: &str) -> Option<&str> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.colors.get(i))
            .map(String::as_str)
    }
}

pub const DEFAULT_PALETTE: [&str; 9] = [
    "#ffcd56", // Eat out
    "#ff6384", // Rent
    "#36a2eb", // Grocery
    "#fd6b19", // Utilities
    "#4bc0c0", // Transportation
    "#9966ff", // Entertainment
    "#00bcd4", // Savings
    "#e91e63", // Healthcare
    "#ffc107", // Education
];

/// Colors assigned by position, cycling when categories outnumber entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    /// Falls back to the default palette when `colors` is empty.
    pub fn new(colors: Vec<String>) -> Self {
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }

    pub fn color_at(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn project(&self, items: &[BudgetItem]) -> ChartSeries {
        ChartSeries {
            values: items.iter().map(|item| item.budget).collect(),
            labels: items.iter().map(|item| item.title.clone()).collect(),
            colors: (0..items.len())
                .map(|i| self.color_at(i).to_string())
                .collect(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_uses_wire_field_name() {
        let json = r#"{"myBudget":[{"title":"Rent","budget":500},{"title":"Food","budget":200.5}]}"#;
        let response: BudgetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.my_budget.len(), 2);
        assert_eq!(response.my_budget[1], BudgetItem::new("Food", 200.5));

        let back = serde_json::to_value(&response).unwrap();
        assert!(back.get("myBudget").is_some());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        assert!(serde_json::from_str::<BudgetResponse>(r#"{"budget":[]}"#).is_err());
        assert!(serde_json::from_str::<BudgetResponse>(r#"{"myBudget":"nope"}"#).is_err());
    }

    #[test]
    fn test_check_rejects_bad_items() {
        let empty_title = BudgetResponse {
            my_budget: vec![BudgetItem::new("  ", 10.0)],
        };
        assert!(empty_title.check().is_err());

        let negative = BudgetResponse {
            my_budget: vec![BudgetItem::new("Rent", -1.0)],
        };
        assert!(negative.check().is_err());

        let ok = BudgetResponse {
            my_budget: vec![BudgetItem::new("Rent", 0.0)],
        };
        assert!(ok.check().is_ok());
    }

    #[test]
    fn test_palette_projection_keeps_order() {
        let items = vec![BudgetItem::new("Rent", 500.0), BudgetItem::new("Food", 200.0)];
        let series = Palette::default().project(&items);

        assert_eq!(series.values, vec![500.0, 200.0]);
        assert_eq!(series.labels, vec!["Rent", "Food"]);
        assert_ne!(series.colors[0], series.colors[1]);
        assert_eq!(series.color_of("Food"), Some("#ff6384"));
    }

    #[test]
    fn test_palette_cycles() {
        let palette = Palette::new(vec!["#111".to_string(), "#222".to_string()]);
        let items: Vec<BudgetItem> = (0..5)
            .map(|i| BudgetItem::new(format!("c{}", i), 1.0))
            .collect();
        let series = palette.project(&items);
        assert_eq!(series.colors, vec!["#111", "#222", "#111", "#222", "#111"]);
    }

    #[test]
    fn test_empty_palette_falls_back_to_default() {
        assert_eq!(Palette::new(vec![]).len(), DEFAULT_PALETTE.len());
    }
}
