//! `#[derive(WireCodec)]` — generates `WireSerialize`/`WireDeserialize` impls that encode a
//! struct's fields in declaration order, one after another, into a flat byte buffer.
//!
//! The expansion shape mirrors a hand-written impl: accumulate a byte offset, serialize
//! (or deserialize) each field through its own `WireSerialize`/`WireDeserialize` impl, and
//! report the total number of bytes consumed. Nothing here inspects field types beyond their
//! names — any field type that itself implements the two traits works, including fixed-size
//! byte arrays (`[u8; N]`), which is how the on-medium filename field is handled.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

#[proc_macro_derive(WireCodec)]
pub fn derive_wire_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input).into()
}

fn expand(input: &DeriveInput) -> TokenStream2 {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => panic!("WireCodec can only be derived for structs with named fields"),
        },
        _ => panic!("WireCodec can only be derived for structs"),
    };

    let field_names: Vec<_> = fields.iter().map(|f| f.ident.clone().unwrap()).collect();
    let field_types: Vec<_> = fields.iter().map(|f| f.ty.clone()).collect();

    let serialize_steps = field_names.iter().map(|field| {
        quote! {
            acc += eefs_serialize::WireSerialize::serialize(&self.#field, endianness, &mut target[acc..])?;
        }
    });

    let deserialize_steps = field_names.iter().zip(field_types.iter()).map(|(field, ty)| {
        quote! {
            let (#field, written) = <#ty as eefs_serialize::WireDeserialize>::deserialize(endianness, &input[acc..])?;
            acc += written;
        }
    });

    quote! {
        impl eefs_serialize::WireSerialize for #name {
            fn serialize(
                &self,
                endianness: eefs_serialize::Endianness,
                target: &mut [u8],
            ) -> Result<usize, eefs_serialize::SerError> {
                let mut acc: usize = 0;
                #(#serialize_steps)*
                Ok(acc)
            }
        }

        impl eefs_serialize::WireDeserialize for #name {
            fn deserialize(
                endianness: eefs_serialize::Endianness,
                input: &[u8],
            ) -> Result<(Self, usize), eefs_serialize::DeError>
            where
                Self: Sized,
            {
                let mut acc: usize = 0;
                #(#deserialize_steps)*
                Ok((Self { #(#field_names),* }, acc))
            }
        }
    }
}
