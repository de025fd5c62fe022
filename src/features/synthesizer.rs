//! Deterministic reconstruction of the training feature set from a partial profile.

use super::{CustomerProfile, FeatureSchema, FeatureVector};
use crate::config::FeaturesConfig;
use crate::error::ScoreError;

/// Estimated account age contributed by each historical order, in days.
const DAYS_PER_ORDER: f64 = 30.0;
/// Items assumed per order when the true count is unknown.
const ITEMS_PER_ORDER: f64 = 5.0;
const MAX_ORDER_FACTOR: f64 = 1.5;
const MIN_ORDER_FACTOR: f64 = 0.5;
/// Proxy for order-value spread; not a measured standard deviation.
const STD_ORDER_FACTOR: f64 = 0.2;
const REPEAT_PURCHASE_RATE: f64 = 0.5;
const AVG_BASKET_SIZE: f64 = 3.0;
const DEFAULT_HOUR: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Recency,
    Frequency,
    Monetary,
    CustomerAgeDays,
    DaysBetweenPurchases,
    OrdersLast30d,
    OrdersLast90d,
    AvgOrderValue,
    MaxOrderValue,
    MinOrderValue,
    StdOrderValue,
    ProductDiversity,
    RepeatPurchaseRate,
    AvgBasketSize,
    TotalItemsBought,
    IsWeekend,
    Hour,
    SpendingIncreasing,
}

impl Rule {
    fn parse(name: &str) -> Option<Self> {
        let rule = match name.to_ascii_lowercase().as_str() {
            "recency" => Rule::Recency,
            "frequency" => Rule::Frequency,
            "monetary" => Rule::Monetary,
            "customer_age_days" => Rule::CustomerAgeDays,
            "days_between_purchases" => Rule::DaysBetweenPurchases,
            "orders_last_30d" => Rule::OrdersLast30d,
            "orders_last_90d" => Rule::OrdersLast90d,
            "avg_order_value" => Rule::AvgOrderValue,
            "max_order_value" => Rule::MaxOrderValue,
            "min_order_value" => Rule::MinOrderValue,
            "std_order_value" => Rule::StdOrderValue,
            "product_diversity" => Rule::ProductDiversity,
            "repeat_purchase_rate" => Rule::RepeatPurchaseRate,
            "avg_basket_size" => Rule::AvgBasketSize,
            "total_items_bought" => Rule::TotalItemsBought,
            "is_weekend" => Rule::IsWeekend,
            "hour" => Rule::Hour,
            "spending_increasing" => Rule::SpendingIncreasing,
            _ => return None,
        };
        Some(rule)
    }
}

/// Intermediate quantities shared by several rules.
struct Derived {
    recency: f64,
    frequency: f64,
    monetary: f64,
    avg_order_value: f64,
    customer_age_days: f64,
}

impl Derived {
    fn new(p: &CustomerProfile) -> Self {
        let recency = f64::from(p.recency);
        let frequency = f64::from(p.frequency);
        let avg_order_value = p.avg_order_value.unwrap_or(p.monetary / frequency);
        let customer_age_days = p
            .customer_age_days
            .map(f64::from)
            .unwrap_or(recency + frequency * DAYS_PER_ORDER);
        Self {
            recency,
            frequency,
            monetary: p.monetary,
            avg_order_value,
            customer_age_days,
        }
    }

    fn value(&self, rule: Rule, p: &CustomerProfile) -> f64 {
        match rule {
            Rule::Recency => self.recency,
            Rule::Frequency => self.frequency,
            Rule::Monetary => self.monetary,
            Rule::CustomerAgeDays => self.customer_age_days,
            Rule::DaysBetweenPurchases => self.customer_age_days / self.frequency,
            Rule::OrdersLast30d => p.orders_last_30d.map(f64::from).unwrap_or(
                if p.recency < 30 { 1.0 } else { 0.0 },
            ),
            Rule::OrdersLast90d => p.orders_last_90d.map(f64::from).unwrap_or(
                if p.recency < 90 { self.frequency } else { 0.0 },
            ),
            Rule::AvgOrderValue => self.avg_order_value,
            Rule::MaxOrderValue => self.avg_order_value * MAX_ORDER_FACTOR,
            Rule::MinOrderValue => self.avg_order_value * MIN_ORDER_FACTOR,
            Rule::StdOrderValue => self.avg_order_value * STD_ORDER_FACTOR,
            Rule::ProductDiversity => p
                .product_diversity
                .map(f64::from)
                .unwrap_or(self.frequency),
            Rule::RepeatPurchaseRate => REPEAT_PURCHASE_RATE,
            Rule::AvgBasketSize => AVG_BASKET_SIZE,
            Rule::TotalItemsBought => self.frequency * ITEMS_PER_ORDER,
            Rule::IsWeekend => p.is_weekend_fraction.unwrap_or(0.0),
            Rule::Hour => DEFAULT_HOUR,
            Rule::SpendingIncreasing => match p.spending_trend {
                Some(t) if t > 0.0 => 1.0,
                Some(_) => 0.0,
                None => 1.0,
            },
        }
    }
}

/// Maps profiles onto a fixed schema. Rules are resolved once per schema slot.
#[derive(Debug, Clone)]
pub struct FeatureSynthesizer {
    schema: FeatureSchema,
    rules: Vec<Option<Rule>>,
    frequency_floor: Option<u32>,
}

impl FeatureSynthesizer {
    /// Lenient synthesizer without a frequency floor: unknown names are zero-filled.
    pub fn new(schema: FeatureSchema) -> Self {
        let rules = schema.names().iter().map(|n| Rule::parse(n)).collect();
        Self {
            schema,
            rules,
            frequency_floor: None,
        }
    }

    /// Build from config. `strict_schema` turns unknown names into `SchemaMismatch`.
    pub fn with_config(schema: FeatureSchema, config: &FeaturesConfig) -> Result<Self, ScoreError> {
        let mut s = Self::new(schema);
        if config.strict_schema {
            let unknown: Vec<&str> = s
                .schema
                .names()
                .iter()
                .zip(&s.rules)
                .filter(|(_, r)| r.is_none())
                .map(|(n, _)| n.as_str())
                .collect();
            if !unknown.is_empty() {
                return Err(ScoreError::SchemaMismatch(format!(
                    "no derivation rule for {}",
                    unknown.join(", ")
                )));
            }
        }
        s.frequency_floor = config.frequency_floor.filter(|&f| f > 0);
        Ok(s)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Names in the schema that fall back to zero.
    pub fn zero_filled(&self) -> impl Iterator<Item = &str> + '_ {
        self.schema
            .names()
            .iter()
            .zip(&self.rules)
            .filter(|(_, r)| r.is_none())
            .map(|(n, _)| n.as_str())
    }

    pub fn synthesize(&self, profile: &CustomerProfile) -> Result<FeatureVector, ScoreError> {
        let floored;
        let profile = match self.frequency_floor {
            Some(floor) if profile.frequency < floor => {
                floored = profile.clone().with_frequency_floor(floor);
                &floored
            }
            _ => profile,
        };
        profile.validate()?;

        let derived = Derived::new(profile);
        let values = self
            .rules
            .iter()
            .map(|rule| rule.map(|r| derived.value(r, profile)).unwrap_or(0.0))
            .collect();
        Ok(FeatureVector::from_parts(self.schema.clone(), values))
    }
}
