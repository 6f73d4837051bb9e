//! The interface resolver: binding registration and the resolution
//! ladder.
//!
//! Pass 1 walks every service-marked class and registers bindings for
//! each strategy that applies (interface, inheritance, state, bare
//! class). Pass 2 records constructor dependencies. `resolve` then
//! answers one string-keyed request through an ordered ladder of match
//! tiers; the first tier with any match wins.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::extract;
use crate::keys;
use crate::model::{Binding, BindingKind, DependencyRecord, Scope};
use crate::options::AnalyzerOptions;
use crate::source::ClassDecl;

// ── BindingsTable ───────────────────────────────────────────────────────────

/// All bindings registered during one scan, with the indexes resolution
/// needs. Owned exclusively by the resolver; recreated on reset.
#[derive(Debug, Default)]
pub struct BindingsTable {
    bindings: Vec<Binding>,
    by_key: HashMap<String, Vec<usize>>,
    by_location: HashMap<String, usize>,
    by_composite: HashMap<String, usize>,
}

impl BindingsTable {
    /// Register one binding. A duplicate composite id is dropped — the
    /// same class cannot provide the same key through the same strategy
    /// twice.
    pub fn register(&mut self, binding: Binding) {
        let composite = binding.composite_id();
        if self.by_composite.contains_key(&composite) {
            debug!(composite, "duplicate binding skipped");
            return;
        }

        let idx = self.bindings.len();
        self.by_key
            .entry(binding.sanitized_key.clone())
            .or_default()
            .push(idx);
        // Location keys are always indexed, collision or not.
        self.by_location.insert(binding.location_key(), idx);
        self.by_composite.insert(composite, idx);
        self.bindings.push(binding);
    }

    pub fn all(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn by_location_key(&self, key: &str) -> Option<&Binding> {
        self.by_location.get(key).map(|&i| &self.bindings[i])
    }

    fn with_key(&self, key: &str) -> impl Iterator<Item = &Binding> {
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .map(|&i| &self.bindings[i])
    }

    /// Sanitized keys that map to more than one binding, for ambiguity
    /// reporting. Direct class secondaries do not count.
    pub fn contested_keys(&self) -> impl Iterator<Item = (&str, Vec<&Binding>)> {
        self.by_key.iter().filter_map(|(key, idxs)| {
            let primaries: Vec<&Binding> = idxs
                .iter()
                .map(|&i| &self.bindings[i])
                .filter(|b| !b.direct)
                .collect();
            (primaries.len() > 1).then_some((key.as_str(), primaries))
        })
    }
}

// ── Resolution ──────────────────────────────────────────────────────────────

/// A successful resolution: the chosen binding, the ladder tier that
/// produced it, and any co-candidates the choice was made over.
#[derive(Debug)]
pub struct Resolution<'a> {
    pub binding: &'a Binding,
    /// Ladder tier (0 = location-qualified bypass, 1–7 as specified).
    pub tier: u8,
    /// Equally-ranked candidates that lost the deterministic tie-break.
    /// Non-empty means the request was ambiguous.
    pub ambiguous: Vec<&'a Binding>,
    /// The match came from partial key containment (tier 7).
    pub partial: bool,
}

impl Resolution<'_> {
    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous.is_empty()
    }
}

// ── InterfaceResolver ───────────────────────────────────────────────────────

/// Drives the extractors over all source files and answers resolution
/// queries. Owns the bindings and dependency tables for one scan.
pub struct InterfaceResolver {
    options: AnalyzerOptions,
    bindings: BindingsTable,
    dependencies: BTreeMap<String, DependencyRecord>,
    /// Scope / profile metadata per service class, for validation.
    class_scopes: HashMap<String, Scope>,
    class_profiles: HashMap<String, Vec<String>>,
    /// Classes whose `extends` chain loops back on itself, with the
    /// chain walked before the loop was hit.
    inheritance_cycles: Vec<(String, Vec<String>)>,
}

impl InterfaceResolver {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            options,
            bindings: BindingsTable::default(),
            dependencies: BTreeMap::new(),
            class_scopes: HashMap::new(),
            class_profiles: HashMap::new(),
            inheritance_cycles: Vec::new(),
        }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn bindings(&self) -> &BindingsTable {
        &self.bindings
    }

    pub fn dependencies(&self) -> &BTreeMap<String, DependencyRecord> {
        &self.dependencies
    }

    /// All service-marked class names seen during Pass 1.
    pub fn service_classes(&self) -> impl Iterator<Item = &str> {
        self.class_scopes.keys().map(String::as_str)
    }

    pub fn scope_of_class(&self, class: &str) -> Scope {
        self.class_scopes.get(class).copied().unwrap_or_default()
    }

    pub fn profiles_of_class(&self, class: &str) -> &[String] {
        self.class_profiles
            .get(class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Classes with looping `extends` chains, for validation.
    pub fn inheritance_cycles(&self) -> &[(String, Vec<String>)] {
        &self.inheritance_cycles
    }

    /// Drop all tables for a full rescan.
    pub fn reset(&mut self) {
        self.bindings = BindingsTable::default();
        self.dependencies.clear();
        self.class_scopes.clear();
        self.class_profiles.clear();
        self.inheritance_cycles.clear();
    }

    // ── Pass 1 ──────────────────────────────────────────────────────────

    /// Register all bindings for one service-marked class.
    pub fn register_class(
        &mut self,
        class: &ClassDecl,
        rel_path: &str,
        classes_by_name: &HashMap<String, ClassDecl>,
    ) {
        if !extract::is_service(class) {
            return;
        }

        let scope = extract::scope_of(class);
        let primary = extract::is_primary(class);
        let qualifier = extract::qualifier_of(class);
        let profiles = extract::profiles_of(class);
        self.class_scopes.insert(class.name.clone(), scope);
        self.class_profiles
            .insert(class.name.clone(), profiles.clone());

        let template = Binding {
            interface_name: class.name.clone(),
            implementation_class: class.name.clone(),
            file_path: rel_path.to_string(),
            line_number: class.line,
            is_generic: !class.type_params.is_empty(),
            type_parameters: class.type_params.clone(),
            sanitized_key: String::new(),
            kind: BindingKind::Class,
            direct: false,
            primary,
            scope,
            qualifier,
            profiles,
            base_class: None,
            base_class_generic: None,
            inheritance_chain: vec![],
            state_type: None,
            service_interface: None,
        };

        let mut strategy_fired = false;

        // 1. Implemented interfaces.
        if self.options.enable_interface_resolution {
            for iface in extract::implemented_interfaces(class) {
                strategy_fired = true;
                self.bindings.register(Binding {
                    interface_name: iface.name.clone(),
                    sanitized_key: keys::sanitize(&iface.full_type),
                    kind: BindingKind::Interface,
                    is_generic: iface.is_generic,
                    type_parameters: iface.type_parameters.clone(),
                    ..template.clone()
                });
            }
        }

        // 2. Base-class chain.
        if self.options.enable_inheritance_di {
            let info = extract::analyze_inheritance(
                class,
                classes_by_name,
                self.options.max_inheritance_depth,
            );
            if info.cycle {
                self.inheritance_cycles
                    .push((class.name.clone(), info.chain.clone()));
            }
            for mapping in &info.mappings {
                strategy_fired = true;
                // Inheritance bindings keep the descriptive key form;
                // tier 3 also matches them under the regular form.
                self.bindings.register(Binding {
                    interface_name: mapping.base_class.clone(),
                    sanitized_key: mapping.inheritance_key.clone(),
                    kind: BindingKind::Inheritance,
                    is_generic: mapping.is_generic,
                    type_parameters: mapping.type_parameters.clone(),
                    base_class: Some(mapping.base_class.clone()),
                    base_class_generic: Some(mapping.base_class_generic.clone()),
                    inheritance_chain: info.chain.clone(),
                    ..template.clone()
                });
            }
        }

        // 3. State-container pattern.
        if self.options.enable_state_di {
            if let Some(reg) = extract::extract_state(class, &self.options.state_base_names) {
                strategy_fired = true;
                self.bindings.register(Binding {
                    interface_name: reg.state_type.clone(),
                    sanitized_key: reg.state_key.clone(),
                    kind: BindingKind::State,
                    state_type: Some(reg.state_type.clone()),
                    service_interface: Some(reg.service_interface.clone()),
                    ..template.clone()
                });
            }
        }

        // 4–5. Bare-class binding: the primary representation when no
        // strategy fired, a lower-precedence "direct" secondary otherwise.
        self.bindings.register(Binding {
            sanitized_key: keys::sanitize(&class.name),
            kind: BindingKind::Class,
            direct: strategy_fired,
            ..template
        });
    }

    // ── Pass 2 ──────────────────────────────────────────────────────────

    /// Record the dependency sites of one service-marked class.
    pub fn register_dependencies(&mut self, class: &ClassDecl, rel_path: &str) {
        if !extract::is_service(class) {
            return;
        }
        if let Some(record) = extract::extract_dependencies(class, rel_path) {
            self.dependencies
                .insert(record.service_class.clone(), record);
        }
    }

    // ── Resolution ladder ───────────────────────────────────────────────

    /// Resolve one type spelling to a binding.
    ///
    /// Tiers, first hit wins; within a tier a `@Primary` binding wins,
    /// otherwise the first by `(file, line, class)` is chosen and the
    /// rest are reported as ambiguous:
    ///
    /// 1. exact key match on a primary (non-class) binding
    /// 2. state-container pattern for `Base<S>` spellings
    /// 3. inheritance bindings, regular or inheritance-flavored key
    /// 4. state bindings by key
    /// 5. class bindings (primary registrations before "direct")
    /// 6. raw `interfaceName` equality
    /// 7. partial key containment (reported as a warning)
    ///
    /// Location-qualified keys bypass the ladder entirely.
    pub fn resolve(&self, spelling: &str) -> Option<Resolution<'_>> {
        let raw = spelling.trim();

        if raw.contains("__") {
            if let Some(binding) = self.bindings.by_location_key(raw) {
                return Some(Resolution {
                    binding,
                    tier: 0,
                    ambiguous: vec![],
                    partial: false,
                });
            }
        }

        let key = keys::canonical_key(raw);

        // Tier 1: primary bindings with the exact key.
        let primaries: Vec<&Binding> = self
            .bindings
            .with_key(&key)
            .filter(|b| b.kind != BindingKind::Class)
            .collect();
        if let Some(res) = pick(primaries, 1) {
            return Some(res);
        }

        // Tier 2: state-container pattern on the input spelling.
        if let Some((_, state_arg)) = split_generic(raw) {
            let exact_state: Vec<&Binding> = self
                .bindings
                .all()
                .iter()
                .filter(|b| {
                    b.kind == BindingKind::State
                        && b.service_interface.as_deref() == Some(raw)
                        && b.state_type.as_deref() == Some(state_arg)
                })
                .collect();
            if let Some(res) = pick(exact_state, 2) {
                return Some(res);
            }

            let base_generic: Vec<&Binding> = self
                .bindings
                .all()
                .iter()
                .filter(|b| {
                    b.kind == BindingKind::Inheritance
                        && b.base_class_generic.as_deref() == Some(raw)
                })
                .collect();
            if let Some(res) = pick(base_generic, 2) {
                return Some(res);
            }

            let any_key: Vec<&Binding> = self.bindings.with_key(&key).collect();
            if let Some(res) = pick(any_key, 2) {
                return Some(res);
            }
        }

        // Tier 3: inheritance bindings under either canonical form of
        // the input.
        let inheritance_flavored = keys::sanitize_inheritance(raw);
        let mut inherit: Vec<&Binding> = self
            .bindings
            .with_key(&key)
            .filter(|b| b.kind == BindingKind::Inheritance)
            .collect();
        if inheritance_flavored != key {
            for b in self
                .bindings
                .with_key(&inheritance_flavored)
                .filter(|b| b.kind == BindingKind::Inheritance)
            {
                if !inherit.iter().any(|seen| std::ptr::eq(*seen, b)) {
                    inherit.push(b);
                }
            }
        }
        if let Some(res) = pick(inherit, 3) {
            return Some(res);
        }

        // Tier 4: state bindings by key.
        let state: Vec<&Binding> = self
            .bindings
            .with_key(&key)
            .filter(|b| b.kind == BindingKind::State)
            .collect();
        if let Some(res) = pick(state, 4) {
            return Some(res);
        }

        // Tier 5: class bindings; primary registrations outrank "direct".
        let classes: Vec<&Binding> = self
            .bindings
            .with_key(&key)
            .filter(|b| b.kind == BindingKind::Class)
            .collect();
        if let Some(res) = pick(classes, 5) {
            return Some(res);
        }

        // Tier 6: raw interface-name equality.
        let by_name: Vec<&Binding> = self
            .bindings
            .all()
            .iter()
            .filter(|b| b.interface_name == raw)
            .collect();
        if let Some(res) = pick(by_name, 6) {
            return Some(res);
        }

        // Tier 7: partial containment over composite ids.
        if !key.is_empty() && key != keys::EMPTY_KEY {
            let contains: Vec<&Binding> = self
                .bindings
                .all()
                .iter()
                .filter(|b| b.composite_id().contains(&key))
                .collect();
            if let Some(mut res) = pick(contains, 7) {
                res.partial = true;
                return Some(res);
            }
        }

        None
    }
}

/// Choose among a tier's candidates: `@Primary` first, then the
/// deterministic `(file, line, class)` order; leftover non-primary
/// co-candidates are reported as ambiguous.
fn pick(mut candidates: Vec<&Binding>, tier: u8) -> Option<Resolution<'_>> {
    if candidates.is_empty() {
        return None;
    }

    candidates.sort_by(|a, b| {
        b.primary
            .cmp(&a.primary)
            .then_with(|| a.direct.cmp(&b.direct))
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line_number.cmp(&b.line_number))
            .then_with(|| a.implementation_class.cmp(&b.implementation_class))
    });

    let binding = candidates[0];
    let ambiguous = if binding.primary {
        vec![]
    } else {
        candidates
            .into_iter()
            .skip(1)
            .filter(|b| b.implementation_class != binding.implementation_class)
            .collect()
    };

    Some(Resolution {
        binding,
        tier,
        ambiguous,
        partial: false,
    })
}

/// Split `Base<Args>` into `(Base, first-arg)`.
fn split_generic(spelling: &str) -> Option<(&str, &str)> {
    let open = spelling.find('<')?;
    let close = spelling.rfind('>')?;
    if close <= open {
        return None;
    }
    let inner = &spelling[open + 1..close];
    let first = keys::split_top_level(inner, ',').first().copied()?;
    Some((spelling[..open].trim(), first))
}
