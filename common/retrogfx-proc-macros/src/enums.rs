use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident};

/// Parse a derive input and hand the enum name and its unit variants to `expand`. Anything other
/// than an enum of unit variants becomes a compile error at the offending item.
fn expand_unit_enum(
    input: TokenStream,
    derive: &str,
    expand: impl FnOnce(&Ident, &[&Ident]) -> TokenStream2,
) -> TokenStream {
    let ast = match syn::parse::<DeriveInput>(input) {
        Ok(ast) => ast,
        Err(err) => return err.to_compile_error().into(),
    };

    let name = &ast.ident;
    let Data::Enum(data) = &ast.data else {
        return syn::Error::new_spanned(name, format!("{derive} can only be derived for enums"))
            .to_compile_error()
            .into();
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new_spanned(
                variant,
                format!("{derive} requires unit variants; {name}::{} has fields", variant.ident),
            )
            .to_compile_error()
            .into();
        }
        variants.push(&variant.ident);
    }

    expand(name, &variants).into()
}

pub fn enum_display(input: TokenStream) -> TokenStream {
    expand_unit_enum(input, "EnumDisplay", |name, variants| {
        let labels = variants.iter().map(ToString::to_string);

        quote! {
            impl #name {
                #[must_use]
                pub fn to_str(&self) -> &'static str {
                    match self {
                        #(Self::#variants => #labels,)*
                    }
                }
            }

            impl ::std::fmt::Display for #name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.write_str(self.to_str())
                }
            }
        }
    })
}

pub fn enum_from_str(input: TokenStream) -> TokenStream {
    expand_unit_enum(input, "EnumFromStr", |name, variants| {
        let lowercase = variants.iter().map(|variant| variant.to_string().to_ascii_lowercase());
        let error = format!("invalid {name} value: '{{}}'");

        quote! {
            impl ::std::str::FromStr for #name {
                type Err = ::std::string::String;

                fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                    match s.to_ascii_lowercase().as_str() {
                        #(#lowercase => ::std::result::Result::Ok(Self::#variants),)*
                        _ => ::std::result::Result::Err(::std::format!(#error, s)),
                    }
                }
            }
        }
    })
}

pub fn enum_all(input: TokenStream) -> TokenStream {
    expand_unit_enum(input, "EnumAll", |name, variants| {
        let len = variants.len();

        quote! {
            impl #name {
                pub const ALL: [Self; #len] = [#(Self::#variants,)*];
            }
        }
    })
}

pub fn custom_value_enum(input: TokenStream) -> TokenStream {
    expand_unit_enum(input, "CustomValueEnum", |name, _| {
        quote! {
            impl ::clap::ValueEnum for #name {
                fn value_variants<'a>() -> &'a [Self] {
                    &Self::ALL
                }

                fn to_possible_value(&self) -> ::std::option::Option<::clap::builder::PossibleValue> {
                    ::std::option::Option::Some(::clap::builder::PossibleValue::new(self.to_str()))
                }
            }
        }
    })
}
