// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Extraction and validation of the parts of a function signature that become the cache key
//! and the cached value.

use proc_macro2::{Ident, Span};
use syn::visit::{self, Visit};
use syn::visit_mut::{self, VisitMut};
use syn::{
    FnArg, GenericParam, Lifetime, ParenthesizedGenericArguments, Pat, PatIdent, Receiver, ReturnType, Signature, Type,
    TypeBareFn, TypeImplTrait, TypeInfer, TypePath, TypeReference, parse_quote,
};

use crate::TransformError;

/// One typed parameter of a cached function.
#[derive(Debug, Clone)]
pub struct Param {
    /// Identifier the parameter value is bound to in the rewritten signature.
    pub binding: Ident,
    /// Original destructuring pattern, re-applied inside the body. `None` for plain identifiers.
    pub pattern: Option<Pat>,
    /// Declared parameter type, with `Self` substituted where a concrete type is known.
    pub ty: Type,
}

/// The parts of a function signature the synthesis works with.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Method receiver, never part of the key.
    pub receiver: Option<Receiver>,
    /// Typed parameters in declaration order.
    pub params: Vec<Param>,
    /// Cached value type: the declared return type, `()` when omitted.
    pub output: Type,
}

/// How strictly types must resolve for a particular holder.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeRules<'a> {
    /// Concrete type that replaces a bare `Self`.
    pub self_ty: Option<&'a Type>,
    /// Whether any remaining `Self` is an error, as it is in the type of a `static`.
    pub forbid_self: bool,
}

impl TypeRules<'_> {
    /// Substitutes `Self` and checks that `ty` names an owned type the holder can store.
    pub fn resolve(&self, ty: &Type) -> syn::Result<Type> {
        let mut ty = ty.clone();
        if let Some(self_ty) = self.self_ty {
            SelfReplacer { self_ty }.visit_type_mut(&mut ty);
        }

        let mut validator = Validator {
            forbid_self: self.forbid_self,
            error: None,
        };
        validator.visit_type(&ty);

        match validator.error {
            Some(error) => Err(error),
            None => Ok(ty),
        }
    }

    /// Like [`resolve`](Self::resolve), but a top-level reference may carry any lifetime since
    /// the key stores an owned copy of the referenced value.
    pub fn resolve_param(&self, ty: &Type) -> syn::Result<Type> {
        match ungroup(ty) {
            Type::Reference(reference) => {
                let mut reference = reference.clone();
                *reference.elem = self.resolve(&reference.elem)?;
                Ok(Type::Reference(reference))
            }
            _ => self.resolve(ty),
        }
    }
}

/// Looks through the invisible groups of `macro_rules!` fragments (`$t:ty`) and through
/// parentheses.
#[must_use]
pub fn ungroup(ty: &Type) -> &Type {
    match ty {
        Type::Group(group) => ungroup(&group.elem),
        Type::Paren(paren) => ungroup(&paren.elem),
        ty => ty,
    }
}

impl FunctionSignature {
    /// Flattens the parameters of `sig` and validates every key and value type.
    pub fn extract(sig: &Signature, rules: &TypeRules<'_>) -> syn::Result<Self> {
        if let Some(asyncness) = &sig.asyncness {
            return Err(TransformError::UnresolvedType("`async fn` results are futures that cannot be cached").at(asyncness));
        }

        if let Some(constness) = &sig.constness {
            return Err(TransformError::UnresolvedType("a `const fn` cannot read a cache holder").at(constness));
        }

        for param in &sig.generics.params {
            match param {
                GenericParam::Type(_) | GenericParam::Const(_) => {
                    return Err(TransformError::UnresolvedType("generic functions have no single key and value type").at(param));
                }
                GenericParam::Lifetime(_) => {}
            }
        }

        let mut receiver = None;
        let mut params = Vec::new();

        for input in &sig.inputs {
            match input {
                FnArg::Receiver(r) => receiver = Some(r.clone()),
                FnArg::Typed(pat_type) => {
                    let (binding, pattern) = match &*pat_type.pat {
                        Pat::Ident(PatIdent {
                            by_ref: None,
                            subpat: None,
                            ident,
                            ..
                        }) => (ident.clone(), None),
                        pattern => (
                            Ident::new(&format!("__recall_arg{}", params.len()), Span::mixed_site()),
                            Some(pattern.clone()),
                        ),
                    };

                    params.push(Param {
                        binding,
                        pattern,
                        ty: rules.resolve_param(&pat_type.ty)?,
                    });
                }
            }
        }

        let output = match &sig.output {
            ReturnType::Default => parse_quote!(()),
            ReturnType::Type(_, ty) => rules.resolve(ty)?,
        };

        Ok(Self {
            receiver,
            params,
            output,
        })
    }

    /// Returns `true` if the receiver borrows `self` (`&self`, `&mut self`, `self: &Self`).
    #[must_use]
    pub fn has_reference_receiver(&self) -> bool {
        self.receiver.as_ref().is_some_and(|receiver| matches!(*receiver.ty, Type::Reference(_)))
    }

    /// Replaces every destructuring parameter pattern in `sig` with its fresh binding.
    ///
    /// The patterns themselves are re-applied inside the rewritten body.
    pub fn rebind_patterns(&self, sig: &mut Signature) {
        let typed = sig.inputs.iter_mut().filter_map(|input| match input {
            FnArg::Typed(pat_type) => Some(pat_type),
            FnArg::Receiver(_) => None,
        });

        for (pat_type, param) in typed.zip(&self.params) {
            if param.pattern.is_some() {
                let binding = &param.binding;
                *pat_type.pat = parse_quote!(#binding);
            }
        }
    }
}

struct SelfReplacer<'a> {
    self_ty: &'a Type,
}

impl VisitMut for SelfReplacer<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        if let Type::Path(TypePath { qself: None, path }) = ty
            && path.is_ident("Self")
        {
            *ty = self.self_ty.clone();
            return;
        }

        visit_mut::visit_type_mut(self, ty);
    }
}

struct Validator {
    forbid_self: bool,
    error: Option<syn::Error>,
}

impl Validator {
    fn fail(&mut self, error: syn::Error) {
        match &mut self.error {
            Some(existing) => existing.combine(error),
            None => self.error = Some(error),
        }
    }
}

impl<'ast> Visit<'ast> for Validator {
    fn visit_type_impl_trait(&mut self, node: &'ast TypeImplTrait) {
        self.fail(TransformError::UnresolvedType("`impl Trait` has no nameable type").at(node));
    }

    fn visit_type_infer(&mut self, node: &'ast TypeInfer) {
        self.fail(TransformError::UnresolvedType("`_` must be spelled out").at(node));
    }

    fn visit_type_reference(&mut self, node: &'ast TypeReference) {
        if node.lifetime.is_none() {
            self.fail(TransformError::UnresolvedType("borrowed data must be `'static` to be cached").at(node));
        }

        visit::visit_type_reference(self, node);
    }

    fn visit_lifetime(&mut self, node: &'ast Lifetime) {
        if node.ident != "static" {
            self.fail(TransformError::UnresolvedType("borrowed data must be `'static` to be cached").at(node));
        }
    }

    fn visit_type_path(&mut self, node: &'ast TypePath) {
        if self.forbid_self
            && node.qself.is_none()
            && node.path.segments.first().is_some_and(|segment| segment.ident == "Self")
        {
            self.fail(TransformError::UnresolvedType("`Self` is not available to a cache holder; name the type").at(node));
        }

        visit::visit_type_path(self, node);
    }

    // Elided lifetimes in `fn(&T)` and `Fn(&T)` are higher-ranked, not borrowed.
    fn visit_type_bare_fn(&mut self, _node: &'ast TypeBareFn) {}

    fn visit_parenthesized_generic_arguments(&mut self, _node: &'ast ParenthesizedGenericArguments) {}
}

#[cfg(test)]
mod tests {
    use quote::{ToTokens, quote};
    use syn::{ItemFn, TypeGroup, token};

    use super::*;

    fn signature(function: &ItemFn) -> syn::Result<FunctionSignature> {
        FunctionSignature::extract(&function.sig, &TypeRules::default())
    }

    fn tokens(value: impl ToTokens) -> String {
        value.to_token_stream().to_string()
    }

    #[test]
    fn parameters_keep_declaration_order() {
        let function: ItemFn = parse_quote!(fn f(x: i32, s: String, flag: bool) -> i32 { x });

        let signature = signature(&function).unwrap();

        let names: Vec<_> = signature.params.iter().map(|param| param.binding.to_string()).collect();
        assert_eq!(names, ["x", "s", "flag"]);
        assert_eq!(tokens(&signature.params[1].ty), tokens(quote!(String)));
        assert_eq!(tokens(&signature.output), tokens(quote!(i32)));
        assert!(signature.receiver.is_none());
    }

    #[test]
    fn missing_return_type_caches_unit() {
        let function: ItemFn = parse_quote!(fn tick() {});
        let signature = signature(&function).unwrap();

        assert!(signature.params.is_empty());
        assert_eq!(tokens(&signature.output), tokens(quote!(())));
    }

    #[test]
    fn receiver_is_not_a_parameter() {
        let function: ItemFn = parse_quote!(fn area(&self, scale: u32) -> u64 { 0 });
        let signature = signature(&function).unwrap();

        assert!(signature.has_reference_receiver());
        assert_eq!(signature.params.len(), 1);
    }

    #[test]
    fn by_value_receiver_is_not_a_reference() {
        let function: ItemFn = parse_quote!(fn consume(self) -> u64 { 0 });
        let signature = signature(&function).unwrap();

        assert!(signature.receiver.is_some());
        assert!(!signature.has_reference_receiver());
    }

    #[test]
    fn patterns_get_fresh_bindings() {
        let function: ItemFn = parse_quote!(fn span(first: u8, (start, end): (u32, u32), _: bool, ref name: String) -> u32 { end - start });
        let signature = signature(&function).unwrap();

        assert!(signature.params[0].pattern.is_none());
        assert_eq!(signature.params[1].binding, "__recall_arg1");
        assert_eq!(tokens(signature.params[1].pattern.as_ref().unwrap()), tokens(quote!((start, end))));
        assert_eq!(signature.params[2].binding, "__recall_arg2");
        assert_eq!(signature.params[3].binding, "__recall_arg3");
    }

    #[test]
    fn rebind_patterns_rewrites_only_patterns() {
        let mut function: ItemFn = parse_quote!(fn span(&self, mut first: u8, (start, end): (u32, u32)) -> u32 { end - start });
        let signature = signature(&function).unwrap();

        signature.rebind_patterns(&mut function.sig);

        let expected: Signature = parse_quote!(fn span(&self, mut first: u8, __recall_arg1: (u32, u32)) -> u32);
        assert_eq!(function.sig, expected);
    }

    #[test]
    fn reference_parameters_may_borrow() {
        let function: ItemFn = parse_quote!(fn shout<'a>(text: &'a str, bytes: &[u8]) -> String { text.to_uppercase() });
        assert!(signature(&function).is_ok());
    }

    #[test]
    fn references_inside_macro_fragments_and_parentheses_are_keys() {
        let mut function: ItemFn = parse_quote!(fn measure(text: &str, label: (&str)) -> usize { text.len() });
        if let Some(FnArg::Typed(pat_type)) = function.sig.inputs.first_mut() {
            let fragment = (*pat_type.ty).clone();
            *pat_type.ty = Type::Group(TypeGroup {
                group_token: token::Group::default(),
                elem: Box::new(fragment),
            });
        }

        let signature = signature(&function).unwrap();

        assert_eq!(tokens(&signature.params[0].ty), tokens(quote!(&str)));
        assert_eq!(tokens(&signature.params[1].ty), tokens(quote!(&str)));
    }

    #[test]
    fn nested_borrows_are_rejected() {
        let function: ItemFn = parse_quote!(fn join(parts: &[&str]) -> String { parts.concat() });
        let error = signature(&function).unwrap_err();
        assert!(error.to_string().contains("'static"));
    }

    #[test]
    fn borrowed_results_are_rejected() {
        let function: ItemFn = parse_quote!(fn first(items: &Vec<String>) -> &String { &items[0] });
        _ = signature(&function).unwrap_err();
    }

    #[test]
    fn static_borrows_are_accepted() {
        let function: ItemFn = parse_quote!(fn label(code: u8) -> &'static str { "ok" });
        assert!(signature(&function).is_ok());
    }

    #[test]
    fn callbacks_with_elided_lifetimes_are_accepted() {
        let function: ItemFn = parse_quote!(fn pick(filter: fn(&str) -> bool) -> Box<dyn Fn(&str) -> bool + Send + Sync> { Box::new(filter) });
        assert!(signature(&function).is_ok());
    }

    #[test]
    fn impl_trait_is_rejected() {
        let argument: ItemFn = parse_quote!(fn f(x: impl Into<u32>) -> u32 { x.into() });
        let output: ItemFn = parse_quote!(fn g(x: u32) -> impl Copy { x });

        assert!(signature(&argument).unwrap_err().to_string().contains("`impl Trait`"));
        assert!(signature(&output).unwrap_err().to_string().contains("`impl Trait`"));
    }

    #[test]
    fn generic_functions_are_rejected() {
        let by_type: ItemFn = parse_quote!(fn f<T: Clone>(x: T) -> T { x });
        let by_const: ItemFn = parse_quote!(fn g<const N: usize>() -> usize { N });
        let by_lifetime: ItemFn = parse_quote!(fn h<'a>(x: &'a str) -> usize { x.len() });

        _ = signature(&by_type).unwrap_err();
        _ = signature(&by_const).unwrap_err();
        assert!(signature(&by_lifetime).is_ok());
    }

    #[test]
    fn async_and_const_functions_are_rejected() {
        let asynchronous: ItemFn = parse_quote!(async fn f(x: u32) -> u32 { x });
        let constant: ItemFn = parse_quote!(const fn g(x: u32) -> u32 { x });

        _ = signature(&asynchronous).unwrap_err();
        _ = signature(&constant).unwrap_err();
    }

    #[test]
    fn self_is_substituted_when_known() {
        let function: ItemFn = parse_quote!(fn origin(scale: Option<Self>) -> Self { todo!() });
        let self_ty: Type = parse_quote!(Point);
        let rules = TypeRules {
            self_ty: Some(&self_ty),
            forbid_self: true,
        };

        let signature = FunctionSignature::extract(&function.sig, &rules).unwrap();

        assert_eq!(tokens(&signature.params[0].ty), tokens(quote!(Option<Point>)));
        assert_eq!(tokens(&signature.output), tokens(quote!(Point)));
    }

    #[test]
    fn self_is_rejected_when_unknown() {
        let function: ItemFn = parse_quote!(fn origin() -> Self { todo!() });
        let associated: ItemFn = parse_quote!(fn unit() -> Self::Unit { todo!() });
        let rules = TypeRules {
            self_ty: None,
            forbid_self: true,
        };

        _ = FunctionSignature::extract(&function.sig, &rules).unwrap_err();
        _ = FunctionSignature::extract(&associated.sig, &rules).unwrap_err();
    }

    #[test]
    fn self_is_allowed_for_instance_holders() {
        let function: ItemFn = parse_quote!(fn double(&self) -> Self { todo!() });
        assert!(signature(&function).is_ok());
    }
}
