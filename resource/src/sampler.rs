//! Sampling calls out of the resource model.

use crate::call::{Call, CallStatus, ResourceInstance};
use crate::chain::needs_parent;
use crate::cluster::ResourceCluster;
use crate::error::{ResourceError, ResourceResult};
use crate::template::CallsTemplate;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use resdep_catalog::{HttpVerb, RestCallAction};

/// Knobs of one sampling request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    /// Maximum number of actions the call may take.
    pub budget: usize,
    /// Stop resolving creation once `budget` is reached.
    pub check_size: bool,
    pub create_resource: bool,
    /// Chance of appending a second PATCH to creating templates.
    pub prob_extra_patch: f64,
}

impl SamplingOptions {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            check_size: true,
            create_resource: true,
            prob_extra_patch: 0.0,
        }
    }

    pub fn without_creation(mut self) -> Self {
        self.create_resource = false;
        self
    }

    pub fn unchecked(mut self) -> Self {
        self.check_size = false;
        self
    }

    pub fn with_extra_patch(mut self, probability: f64) -> Self {
        self.prob_extra_patch = probability;
        self
    }
}

impl ResourceCluster {
    /// Realize `template` on the resource `key`.
    pub fn gen_calls(
        &mut self,
        key: &str,
        template: &str,
        options: SamplingOptions,
        rng: &mut impl Rng,
    ) -> ResourceResult<Call> {
        let call = self.build_call(key, template, options, rng)?;
        self.visit(key, template);
        Ok(call)
    }

    fn build_call(
        &self,
        key: &str,
        template_name: &str,
        options: SamplingOptions,
        rng: &mut impl Rng,
    ) -> ResourceResult<Call> {
        let resource = self.resource(key)?;
        let template = resource.template(template_name)?.clone();
        let verbs = template
            .verbs()
            .ok_or_else(|| ResourceError::unknown_template(key, template_name))?;

        let first_non_post = verbs.iter().position(|v| *v != HttpVerb::Post);
        let target_verb = first_non_post.map(|i| verbs[i]).unwrap_or(HttpVerb::Post);
        let mut target = match resource.action(target_verb) {
            Some(action) => action.clone(),
            // POST template of a resource created by an ancestor
            None if target_verb == HttpVerb::Post => self
                .creators_for(&resource.path, "")
                .into_iter()
                .next()
                .cloned()
                .ok_or_else(|| ResourceError::no_action_for_verb(key, target_verb))?,
            None => return Err(ResourceError::no_action_for_verb(key, target_verb)),
        };
        target.randomize(rng);

        let (status, mut actions) = if options.create_resource && verbs[0] == HttpVerb::Post {
            self.create_resources_for(&mut target, 1, options, rng)
        } else {
            (CallStatus::NotExisting, Vec::new())
        };
        if status != CallStatus::Created && status != CallStatus::NotExisting {
            debug!("creation of {} via {} ended with {:?}", key, template_name, status);
        }

        let trailing: Vec<HttpVerb> = match first_non_post {
            Some(i) => verbs[i + 1..].to_vec(),
            None => Vec::new(),
        };
        let instance = ResourceInstance::of(key, &target);
        let mut rest = Vec::new();
        for verb in trailing {
            rest.push(self.follow_up(key, verb, &target, rng)?);
        }

        let extra_patch = !template.independent
            && template.contains(HttpVerb::Patch)
            && actions.len() + 1 + rest.len() < options.budget
            && options.prob_extra_patch > 0.0
            && rng.gen_bool(options.prob_extra_patch.min(1.0));
        if extra_patch {
            rest.push(self.follow_up(key, HttpVerb::Patch, &target, rng)?);
        }

        actions.push(target);
        actions.extend(rest);
        Ok(Call::new(template, instance, actions, status))
    }

    /// A trailing action bound to the values of `target`.
    fn follow_up(
        &self,
        key: &str,
        verb: HttpVerb,
        target: &RestCallAction,
        rng: &mut impl Rng,
    ) -> ResourceResult<RestCallAction> {
        let mut action = self
            .resource(key)?
            .action(verb)
            .cloned()
            .ok_or_else(|| ResourceError::no_action_for_verb(key, verb))?;
        action.randomize(rng);
        action.bind_params_from(target);
        action.location_id = target.location_id.clone();
        Ok(action)
    }

    /// POSTs that create `target`, outermost first. `length` counts the
    /// actions already planned.
    fn create_resources_for(
        &self,
        target: &mut RestCallAction,
        length: usize,
        options: SamplingOptions,
        rng: &mut impl Rng,
    ) -> (CallStatus, Vec<RestCallAction>) {
        if target.verb == HttpVerb::Post && !needs_parent(&target.path) {
            return (CallStatus::Created, Vec::new());
        }
        if options.check_size && length >= options.budget {
            return (CallStatus::NotEnoughLength, Vec::new());
        }
        let Some(creator) = self
            .creators_for(&target.path, &target.name())
            .into_iter()
            .next()
        else {
            let status = match target.verb {
                HttpVerb::Post => CallStatus::NotFoundDependent,
                _ => CallStatus::NotFound,
            };
            return (status, Vec::new());
        };

        let mut post = creator.clone();
        post.randomize(rng);
        post.bind_to_same_path_resolution(target);

        let (nested, mut prefix) = self.create_resources_for(&mut post, length + 1, options, rng);
        if post.path.is_equivalent(&target.path) {
            target.location_id = post.location_id.clone();
        } else {
            post.save_location = true;
            target.location_id = Some(post.path.to_string());
        }
        prefix.push(post);

        let status = match nested {
            CallStatus::Created => CallStatus::Created,
            CallStatus::NotEnoughLength => CallStatus::NotEnoughLength,
            CallStatus::NotExisting
            | CallStatus::NotFound
            | CallStatus::NotFoundDependent
            | CallStatus::Existing => CallStatus::NotFoundDependent,
        };
        (status, prefix)
    }

    fn visit(&mut self, key: &str, template: &str) {
        if let Some(t) = self
            .resources
            .get_mut(key)
            .and_then(|r| r.templates.get_mut(template))
        {
            t.times += 1;
        }
    }

    /// One action of the resource, under the template named after its verb.
    pub fn sample_one_action(&mut self, key: &str, rng: &mut impl Rng) -> ResourceResult<Call> {
        let resource = self.resource(key)?;
        let action = resource
            .actions
            .choose(rng)
            .ok_or_else(|| ResourceError::unknown_resource(key))?;
        let verb = action.verb;
        self.sample_action_with_verb(key, verb, rng)
    }

    pub fn sample_action_with_verb(
        &mut self,
        key: &str,
        verb: HttpVerb,
        rng: &mut impl Rng,
    ) -> ResourceResult<Call> {
        let resource = self.resource(key)?;
        let mut action = resource
            .action(verb)
            .cloned()
            .ok_or_else(|| ResourceError::no_action_for_verb(key, verb))?;
        let template = resource
            .templates
            .get(verb.as_str())
            .cloned()
            .unwrap_or_else(|| CallsTemplate::new(verb.as_str(), verb != HttpVerb::Post, 1));
        action.randomize(rng);
        let instance = ResourceInstance::of(key, &action);
        let call = Call::new(template, instance, vec![action], CallStatus::NotExisting);
        self.visit(key, verb.as_str());
        Ok(call)
    }

    /// A least-visited template that fits `options.budget`, or `None`.
    pub fn sample_any(
        &mut self,
        key: &str,
        options: SamplingOptions,
        rng: &mut impl Rng,
    ) -> ResourceResult<Option<Call>> {
        let resource = self.resource(key)?;
        let fitting: Vec<&CallsTemplate> = resource
            .templates
            .values()
            .filter(|t| t.size <= options.budget)
            .collect();
        let Some(fewest) = fitting.iter().map(|t| t.times).min() else {
            return Ok(None);
        };
        let least: Vec<String> = fitting
            .iter()
            .filter(|t| t.times == fewest)
            .map(|t| t.name.clone())
            .collect();
        match least.choose(rng) {
            Some(name) => {
                let name = name.clone();
                self.gen_calls(key, &name, options, rng).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Prefer templates that need no creation.
    pub fn sample_independent(
        &mut self,
        key: &str,
        options: SamplingOptions,
        rng: &mut impl Rng,
    ) -> ResourceResult<Option<Call>> {
        let names: Vec<String> = self
            .resource(key)?
            .independent_templates()
            .filter(|t| t.size <= options.budget)
            .map(|t| t.name.clone())
            .collect();
        match names.choose(rng) {
            Some(name) => {
                let name = name.clone();
                self.gen_calls(key, &name, options, rng).map(Some)
            }
            None => self.sample_any(key, options, rng),
        }
    }

    /// The whole creation chain as one call, when it has more than one POST.
    pub fn gen_post_chain(
        &mut self,
        key: &str,
        options: SamplingOptions,
        rng: &mut impl Rng,
    ) -> ResourceResult<Option<Call>> {
        let resource = self.resource(key)?;
        if !resource.has_action(HttpVerb::Post) || resource.creation.len() <= 1 {
            return Ok(None);
        }
        let post = HttpVerb::Post.as_str();
        self.gen_calls(key, post, options, rng).map(Some)
    }

    /// Resample the resource of `call` under another template, or `None`.
    pub fn generate_another(
        &mut self,
        call: &Call,
        options: SamplingOptions,
        rng: &mut impl Rng,
    ) -> ResourceResult<Option<Call>> {
        let key = call.resource_key().to_string();
        let others: Vec<String> = self
            .resource(&key)?
            .templates
            .values()
            .filter(|t| t.name != call.template.name && t.size <= options.budget)
            .map(|t| t.name.clone())
            .collect();
        match others.choose(rng) {
            Some(name) => {
                let name = name.clone();
                self.gen_calls(&key, &name, options, rng).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use resdep_catalog::{Catalogue, Param, RestPath};

    fn action(verb: HttpVerb, path: &str) -> RestCallAction {
        let path = RestPath::parse(path).unwrap();
        let mut action = RestCallAction::new(verb, path.clone());
        for name in path.variable_names() {
            action = action.with_param(Param::path(name));
        }
        action
    }

    fn users() -> ResourceCluster {
        let catalogue = Catalogue::new(vec![
            action(HttpVerb::Post, "/users"),
            action(HttpVerb::Get, "/users"),
            action(HttpVerb::Get, "/users/{id}"),
            action(HttpVerb::Delete, "/users/{id}"),
            action(HttpVerb::Post, "/users/{id}/orders"),
            action(HttpVerb::Get, "/users/{id}/orders/{oid}"),
            action(HttpVerb::Patch, "/users/{id}/orders/{oid}"),
        ])
        .unwrap();
        ResourceCluster::from_catalogue(&catalogue).unwrap()
    }

    #[test]
    fn creating_get_is_preceded_by_the_post() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let call = cluster
            .gen_calls("/users/{id}", "POST-GET", SamplingOptions::new(10), &mut rng)
            .unwrap();

        assert_eq!(call.action_names(), vec!["POST:/users", "GET:/users/{id}"]);
        assert_eq!(call.status, CallStatus::Created);
        assert!(call.actions[0].save_location);
        assert_eq!(call.actions[1].location_id.as_deref(), Some("/users"));
        assert_eq!(cluster.get("/users/{id}").unwrap().templates["POST-GET"].times, 1);
    }

    #[test]
    fn nested_creation_chains_locations() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let call = cluster
            .gen_calls("/users/{id}/orders/{oid}", "POST-GET", SamplingOptions::new(10), &mut rng)
            .unwrap();
        assert_eq!(
            call.action_names(),
            vec!["POST:/users", "POST:/users/{id}/orders", "GET:/users/{id}/orders/{oid}"]
        );
        assert_eq!(call.actions[1].location_id.as_deref(), Some("/users"));
        assert_eq!(call.actions[2].location_id.as_deref(), Some("/users/{id}/orders"));
        assert_eq!(
            call.actions[1].resolved_path().split('/').nth(2),
            call.actions[2].resolved_path().split('/').nth(2)
        );
    }

    #[test]
    fn budget_too_small_is_reported() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let call = cluster
            .gen_calls("/users/{id}/orders/{oid}", "POST-GET", SamplingOptions::new(2), &mut rng)
            .unwrap();
        assert_eq!(call.status, CallStatus::NotEnoughLength);
    }

    #[test]
    fn without_creation_only_template_verbs() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let call = cluster
            .gen_calls(
                "/users/{id}",
                "POST-GET",
                SamplingOptions::new(10).without_creation(),
                &mut rng,
            )
            .unwrap();
        assert_eq!(call.action_names(), vec!["GET:/users/{id}"]);
        assert_eq!(call.status, CallStatus::NotExisting);
    }

    #[test]
    fn extra_patch_is_appended_when_certain() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let call = cluster
            .gen_calls(
                "/users/{id}/orders/{oid}",
                "POST-PATCH",
                SamplingOptions::new(10).with_extra_patch(1.0),
                &mut rng,
            )
            .unwrap();
        assert_eq!(call.len(), 4);
        assert_eq!(call.verbs()[2..].to_vec(), vec![HttpVerb::Patch, HttpVerb::Patch]);
    }

    #[test]
    fn unknown_template_fails_fast() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert!(matches!(
            cluster.gen_calls("/users", "PUT", SamplingOptions::new(10), &mut rng),
            Err(ResourceError::UnknownTemplate { .. })
        ));
        assert!(cluster
            .gen_calls("/nope", "GET", SamplingOptions::new(10), &mut rng)
            .is_err());
    }

    #[test]
    fn any_prefers_least_visited_templates() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..3 {
            let call = cluster
                .sample_any("/users", SamplingOptions::new(10), &mut rng)
                .unwrap()
                .unwrap();
            seen.insert(call.template.name.clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn another_template_differs() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let call = cluster.sample_action_with_verb("/users/{id}", HttpVerb::Get, &mut rng).unwrap();
        let other = cluster
            .generate_another(&call, SamplingOptions::new(10), &mut rng)
            .unwrap()
            .unwrap();
        assert_ne!(other.template.name, call.template.name);
    }

    #[test]
    fn post_chain_needs_more_than_one_post() {
        let mut cluster = users();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert!(cluster
            .gen_post_chain("/users", SamplingOptions::new(10), &mut rng)
            .unwrap()
            .is_none());
        let chain = cluster
            .gen_post_chain("/users/{id}/orders", SamplingOptions::new(10), &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(chain.action_names(), vec!["POST:/users", "POST:/users/{id}/orders"]);
    }

    fn without_root_posts() -> ResourceCluster {
        let catalogue = Catalogue::new(vec![
            action(HttpVerb::Get, "/items/{id}"),
            action(HttpVerb::Post, "/users/{id}/orders"),
            action(HttpVerb::Get, "/users/{id}/orders/{oid}"),
        ])
        .unwrap();
        ResourceCluster::from_catalogue(&catalogue).unwrap()
    }

    #[test]
    fn missing_creator_is_not_found() {
        let cluster = without_root_posts();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut target = cluster.get("/items/{id}").unwrap().action(HttpVerb::Get).unwrap().clone();
        let (status, actions) =
            cluster.create_resources_for(&mut target, 1, SamplingOptions::new(10), &mut rng);
        assert_eq!(status, CallStatus::NotFound);
        assert!(actions.is_empty());
    }

    #[test]
    fn missing_ancestor_creator_is_not_found_dependent() {
        let cluster = without_root_posts();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let key = "/users/{id}/orders/{oid}";
        let mut target = cluster.get(key).unwrap().action(HttpVerb::Get).unwrap().clone();
        let (status, actions) =
            cluster.create_resources_for(&mut target, 1, SamplingOptions::new(10), &mut rng);
        assert_eq!(status, CallStatus::NotFoundDependent);
        let names: Vec<String> = actions.iter().map(RestCallAction::name).collect();
        assert_eq!(names, vec!["POST:/users/{id}/orders"]);

        let mut post = cluster.get("/users/{id}/orders").unwrap().action(HttpVerb::Post).unwrap().clone();
        let (status, actions) =
            cluster.create_resources_for(&mut post, 1, SamplingOptions::new(10), &mut rng);
        assert_eq!(status, CallStatus::NotFoundDependent);
        assert!(actions.is_empty());
    }
}
