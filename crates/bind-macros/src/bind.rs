use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Error, Fields, LitStr, Path, Result, Visibility};

/// What `#[bind(...)]` says about one field.
#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    tags: Vec<(String, LitStr)>,
}

impl FieldAttrs {
    fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut parsed = FieldAttrs::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("bind")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    return Ok(());
                }

                let key = meta.path.get_ident().ok_or_else(|| meta.error("expected a tag key like `query`"))?.unraw().to_string();
                if parsed.tags.iter().any(|(existing, _)| *existing == key) {
                    return Err(meta.error(format!("duplicate tag `{key}`")));
                }

                let value: LitStr = meta.value()?.parse()?;
                parsed.tags.push((key, value));
                Ok(())
            })?;
        }

        Ok(parsed)
    }
}

/// `#[bind(crate = "...")]` on the container, `::micro_bind` when absent.
fn crate_path(attrs: &[Attribute]) -> Result<TokenStream> {
    let mut path = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("bind")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let value: LitStr = meta.value()?.parse()?;
                path = Some(value.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported container attribute, expected `crate = \"...\"`"))
            }
        })?;
    }

    Ok(path.map_or_else(|| quote!(::micro_bind), |path| quote!(#path)))
}

pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(&input.ident, "Bind can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(&data.fields, "Bind requires a struct with named fields"));
    };

    let krate = crate_path(&input.attrs)?;

    let mut fields = Vec::with_capacity(named.named.len());
    for (index, field) in named.named.iter().enumerate() {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        let Some(ident) = &field.ident else {
            return Err(Error::new_spanned(field, "Bind requires named fields"));
        };

        let name = ident.unraw().to_string();
        let keys = attrs.tags.iter().map(|(key, _)| key);
        let values = attrs.tags.iter().map(|(_, value)| value);
        let tags = quote!(&[#((#keys, #values)),*]);

        if attrs.skip || !matches!(field.vis, Visibility::Public(_)) {
            fields.push(quote! {
                #krate::FieldInfo::hidden(#index, #name, #tags)
            });
        } else {
            let ty = &field.ty;
            fields.push(quote! {
                #krate::FieldInfo::exported::<#ty>(#index, #name, #tags, |value| {
                    value
                        .downcast_mut::<Self>()
                        .map(|this| &mut this.#ident as &mut dyn ::core::any::Any)
                })
            });
        }
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Reflect for #ident #ty_generics #where_clause {
            fn type_info() -> #krate::TypeInfo {
                #krate::TypeInfo::structure::<Self>(|| ::std::vec![#(#fields),*])
            }
        }
    })
}
