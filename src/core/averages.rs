use crate::domain::model::{Averages, CoefficientTable, GradeMap};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bucket {
    coefficients: u64,
    points: f64,
}

impl Bucket {
    fn add(&mut self, coefficient: u32, grade: f64) {
        self.coefficients = self.coefficients.saturating_add(u64::from(coefficient));
        self.points += grade * f64::from(coefficient);
    }

    fn average(&self) -> Option<f64> {
        (self.coefficients > 0).then(|| self.points / self.coefficients as f64)
    }
}

/// 加權累計；`all` 永遠等於 `core` 與 `specialty` 的和
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedTotals {
    all: Bucket,
    core: Bucket,
    specialty: Bucket,
}

impl WeightedTotals {
    pub fn accumulate(grades: &GradeMap, table: &CoefficientTable) -> Self {
        let mut totals = Self::default();
        for (subject, &grade) in grades {
            match table.get(subject) {
                Some(coefficient) => totals.add(coefficient, grade),
                None => tracing::debug!("No coefficient defined for {}, excluded", subject),
            }
        }
        totals
    }

    fn add(&mut self, coefficient: u32, grade: f64) {
        self.all.add(coefficient, grade);
        if CoefficientTable::is_specialty(coefficient) {
            self.specialty.add(coefficient, grade);
        } else {
            self.core.add(coefficient, grade);
        }
    }

    pub fn coefficient_sums(&self) -> (u64, u64, u64) {
        (
            self.all.coefficients,
            self.core.coefficients,
            self.specialty.coefficients,
        )
    }

    pub fn averages(&self) -> Averages {
        Averages {
            overall: self.all.average(),
            core: self.core.average(),
            specialty: self.specialty.average(),
        }
    }
}

pub fn weighted_averages(grades: &GradeMap, table: &CoefficientTable) -> Averages {
    WeightedTotals::accumulate(grades, table).averages()
}
