// cvar.rs -- tunable physics variables

use crate::common::com_printf;

use std::collections::HashMap;

/// Announced to clients when changed.
pub const CVAR_SERVER: i32 = 4;
/// Only settable from the command line.
pub const CVAR_NOSET: i32 = 8;

// ============================================================
// Physics variable names
// ============================================================

pub const SV_GRAVITY: &str = "sv_gravity";
pub const SV_FRICTION: &str = "sv_friction";
pub const SV_STOPSPEED: &str = "sv_stopspeed";
pub const SV_MAXVELOCITY: &str = "sv_maxvelocity";
pub const SV_STEPSIZE: &str = "sv_stepsize";
pub const SV_BOUNCE: &str = "sv_bounce";
pub const SV_CLIENTTRACE: &str = "sv_clienttrace";
pub const R_CACHESTUDIO: &str = "r_cachestudio";

/// A console variable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: i32,
    pub value: f32,
}

/// Variable store. Physics reads values through it on every use.
#[derive(Debug, Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// O(1) cvar lookup by name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var_index(&self, name: &str) -> Option<usize> {
        self.cvar_index.get(name).copied()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        match self.find_var(name) {
            Some(var) => var.value,
            None => 0.0,
        }
    }

    /// Get or create a cvar. If it already exists, the value is not changed
    /// but flags are OR'd in.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            flags,
            value: parse_value(value),
        });
        self.cvar_index.insert(name.to_string(), idx);

        idx
    }

    /// Set a cvar value. Write protected variables keep their value.
    pub fn set(&mut self, name: &str, value: &str) -> usize {
        let idx = match self.find_var_index(name) {
            Some(idx) => idx,
            None => return self.get(name, value, 0),
        };

        let var = &mut self.cvar_vars[idx];

        if var.flags & CVAR_NOSET != 0 {
            com_printf(&format!("{} is write protected.\n", name));
            return idx;
        }

        if value == var.string {
            return idx; // not changed
        }

        if var.flags & CVAR_SERVER != 0 {
            com_printf(&format!("Server cvar \"{}\" changed to {}\n", name, value));
        }

        var.string = value.to_string();
        var.value = parse_value(value);

        idx
    }

    /// Set a cvar from a float value.
    pub fn set_value(&mut self, name: &str, value: f32) {
        let val_str = if value == (value as i32) as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &val_str);
    }
}

fn parse_value(value: &str) -> f32 {
    value.trim().parse::<f32>().unwrap_or(0.0)
}

/// Registers every variable the collision and movement code reads, with
/// the stock defaults.
pub fn register_physics_cvars(cvars: &mut CvarContext) {
    cvars.get(SV_GRAVITY, "800", CVAR_SERVER);
    cvars.get(SV_FRICTION, "4", CVAR_SERVER);
    cvars.get(SV_STOPSPEED, "100", CVAR_SERVER);
    cvars.get(SV_MAXVELOCITY, "2000", 0);
    cvars.get(SV_STEPSIZE, "18", CVAR_SERVER);
    cvars.get(SV_BOUNCE, "1", CVAR_SERVER);
    cvars.get(SV_CLIENTTRACE, "1", CVAR_SERVER);
    cvars.get(R_CACHESTUDIO, "1", 0);
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cvar_get_and_find() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", "42", 0);
        assert_eq!(ctx.variable_value("test_var"), 42.0);
        assert_eq!(ctx.find_var("test_var").unwrap().string, "42");
    }

    #[test]
    fn test_cvar_set() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", "10", 0);
        ctx.set("test_var", "20");
        assert_eq!(ctx.variable_value("test_var"), 20.0);
    }

    #[test]
    fn test_cvar_noset() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", "10", CVAR_NOSET);
        ctx.set("test_var", "20");
        assert_eq!(ctx.variable_value("test_var"), 10.0);
        assert_eq!(ctx.find_var("test_var").unwrap().string, "10");
    }

    #[test]
    fn test_cvar_set_value() {
        let mut ctx = CvarContext::new();
        ctx.get("test_var", "0", 0);
        ctx.set_value("test_var", 0.25);
        assert!((ctx.variable_value("test_var") - 0.25).abs() < 0.001);
        ctx.set_value("test_var", 600.0);
        assert_eq!(ctx.find_var("test_var").unwrap().string, "600");
    }

    #[test]
    fn test_cvar_get_creates_once() {
        let mut ctx = CvarContext::new();
        ctx.get("test", "1", 0);
        ctx.get("test", "2", 0);
        assert_eq!(ctx.variable_value("test"), 1.0);
    }

    #[test]
    fn test_cvar_not_found() {
        let ctx = CvarContext::new();
        assert_eq!(ctx.variable_value("nonexistent"), 0.0);
        assert!(ctx.find_var("nonexistent").is_none());
    }

    #[test]
    fn test_physics_defaults() {
        let mut ctx = CvarContext::new();
        register_physics_cvars(&mut ctx);
        assert_eq!(ctx.variable_value(SV_GRAVITY), 800.0);
        assert_eq!(ctx.variable_value(SV_FRICTION), 4.0);
        assert_eq!(ctx.variable_value(SV_STOPSPEED), 100.0);
        assert_eq!(ctx.variable_value(SV_MAXVELOCITY), 2000.0);
        assert_eq!(ctx.variable_value(SV_STEPSIZE), 18.0);
        assert_eq!(ctx.variable_value(SV_BOUNCE), 1.0);
        assert_eq!(ctx.variable_value(SV_CLIENTTRACE), 1.0);
        assert_eq!(ctx.variable_value(R_CACHESTUDIO), 1.0);
    }
}
