//! Solver-independent linear formulation: variables, linear expressions and
//! constraints, kept as plain data so that they can be inspected, evaluated
//! against a candidate assignment and translated to any engine.

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VarId(pub usize);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Domain {
    Binary,
    NonNegative,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Var {
    pub name: String,
    pub domain: Domain,
}

/// A sum of `coefficient * variable` terms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> LinearExpr {
        LinearExpr::default()
    }

    pub fn add(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn with(mut self, var: VarId, coefficient: f64) -> LinearExpr {
        self.add(var, coefficient);
        self
    }

    pub fn extend_scaled(&mut self, other: &LinearExpr, factor: f64) {
        self.terms
            .extend(other.terms.iter().map(|&(v, c)| (v, c * factor)));
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.0]).sum()
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> LinearExpr {
        LinearExpr {
            terms: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::LessEq => "<=",
            Relation::GreaterEq => ">=",
            Relation::Equal => "==",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn leq(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Constraint {
        Constraint {
            name: name.into(),
            expr,
            relation: Relation::LessEq,
            rhs,
        }
    }

    pub fn geq(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Constraint {
        Constraint {
            name: name.into(),
            expr,
            relation: Relation::GreaterEq,
            rhs,
        }
    }

    pub fn eq(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Constraint {
        Constraint {
            name: name.into(),
            expr,
            relation: Relation::Equal,
            rhs,
        }
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.eval(values);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + tolerance,
            Relation::GreaterEq => lhs >= self.rhs - tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        if self.expr.is_empty() {
            write!(f, "0")?;
        }
        for (i, (v, c)) in self.expr.terms().iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{c}*x{}", v.0)?;
        }
        write!(f, " {} {}", self.relation, self.rhs)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Formulation {
    vars: Vec<Var>,
    constraints: Vec<Constraint>,
}

impl Formulation {
    pub fn new() -> Formulation {
        Formulation::default()
    }

    pub fn add_var(&mut self, name: String, domain: Domain) -> VarId {
        self.vars.push(Var { name, domain });
        VarId(self.vars.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.0]
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Constraints broken by the given variable values.
    pub fn violated(&self, values: &[f64], tolerance: f64) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values, tolerance))
            .collect()
    }
}
