use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{FnArg, ImplItem, ItemImpl, parse_macro_input};

/// Maps `#[Event::Xxx]` attribute names to `SkirmishPlugin` trait method names.
fn event_to_trait_method(event_name: &str) -> Option<&'static str> {
    match event_name {
        "ShotFired" => Some("on_shot_fired"),
        "ProjectileHit" => Some("on_projectile_hit"),
        "HitConfirmed" => Some("on_hit_confirmed"),
        "Kill" => Some("on_kill"),
        "PlayerJoin" => Some("on_player_join"),
        "PlayerLeave" => Some("on_player_leave"),
        "Respawn" => Some("on_respawn"),
        "SimulationHalted" => Some("on_simulation_halted"),
        _ => None,
    }
}

/// Proc-macro attribute that generates a `SkirmishPlugin` trait implementation.
///
/// # Usage
/// ```ignore
/// #[skirmish_plugin]
/// impl KillLog {
///     #[Event::Kill]
///     fn on_kill(&self, event: &events::KillEvent) {
///         info!("{} eliminated {}", event.killer_id, event.victim_id);
///     }
/// }
/// ```
///
/// Unknown event names are reported as compile errors on the attribute.
#[proc_macro_attribute]
pub fn skirmish_plugin(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(item as ItemImpl);
    let self_ty = &input.self_ty;

    let mut trait_methods = Vec::new();
    let mut errors = Vec::new();

    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };

        let mut event = None;
        method.attrs.retain(|attr| {
            let segments: Vec<_> = attr.path().segments.iter().collect();
            if segments.len() == 2 && segments[0].ident == "Event" {
                event = Some((segments[1].ident.to_string(), segments[1].ident.span()));
                return false;
            }
            true
        });

        let Some((name, span)) = event else {
            continue;
        };

        let Some(trait_method_name) = event_to_trait_method(&name) else {
            errors.push(syn::Error::new(span, format!("unknown skirmish event `{name}`")));
            continue;
        };

        let event_type = match method.sig.inputs.iter().nth(1) {
            Some(FnArg::Typed(pat_type)) => &pat_type.ty,
            _ => {
                errors.push(syn::Error::new(
                    method.sig.ident.span(),
                    "event handler must take `&self` and the event as its second parameter",
                ));
                continue;
            }
        };

        let trait_method_ident = syn::Ident::new(trait_method_name, Span::call_site());
        let user_method_ident = &method.sig.ident;

        trait_methods.push(quote! {
            fn #trait_method_ident(&self, event: #event_type) {
                self.#user_method_ident(event)
            }
        });
    }

    if let Some(first) = errors.into_iter().reduce(|mut acc, err| {
        acc.combine(err);
        acc
    }) {
        return first.to_compile_error().into();
    }

    let expanded = quote! {
        #input

        impl ::skirmish_client::events::SkirmishPlugin for #self_ty {
            #(#trait_methods)*
        }
    };

    expanded.into()
}
