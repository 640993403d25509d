use proc_macro::TokenStream;

/// Implements `StructPack` and `StructUnpack` for a primitive number type.
///
/// Numbers are always stored little-endian inside a project stream.
#[proc_macro]
pub fn struct_unpack_impl_for_num(item: TokenStream) -> TokenStream {
    let i = syn::parse_macro_input!(item as syn::Ident);
    let output = quote::quote! {
        impl StructUnpack for #i {
            fn unpack(reader: &mut GmkStream, _version: GmkVersion) -> Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<#i>()];
                reader.read_into(&mut buf)?;
                Ok(#i::from_le_bytes(buf))
            }
        }

        impl StructPack for #i {
            fn pack(&self, writer: &mut GmkStream, _version: GmkVersion) -> Result<()> {
                writer.write_bytes(&self.to_le_bytes());
                Ok(())
            }
        }
    };
    output.into()
}

/// Field names of a record struct, in declaration order.
fn record_fields(sut: &syn::ItemStruct) -> syn::Result<Vec<&syn::Ident>> {
    match &sut.fields {
        syn::Fields::Named(fields) => Ok(fields
            .named
            .iter()
            .filter_map(|f| f.ident.as_ref())
            .collect()),
        other => Err(syn::Error::new_spanned(
            other,
            "records must have named fields",
        )),
    }
}

/// Writes every field of a record in declaration order.
///
/// The deriving module needs `GmkStream`, `GmkVersion`, the `struct_pack` traits and
/// `anyhow::Result` in scope.
#[proc_macro_derive(StructPack)]
pub fn struct_pack_derive(input: TokenStream) -> TokenStream {
    let sut = syn::parse_macro_input!(input as syn::ItemStruct);
    let fields = match record_fields(&sut) {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };
    let name = &sut.ident;
    let output = quote::quote! {
        impl StructPack for #name {
            fn pack(&self, writer: &mut GmkStream, version: GmkVersion) -> Result<()> {
                #(self.#fields.pack(writer, version)?;)*
                Ok(())
            }
        }
    };
    output.into()
}

/// Reads every field of a record in declaration order. Same imports as [`macro@StructPack`].
#[proc_macro_derive(StructUnpack)]
pub fn struct_unpack_derive(input: TokenStream) -> TokenStream {
    let sut = syn::parse_macro_input!(input as syn::ItemStruct);
    let fields = match record_fields(&sut) {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };
    let types = match &sut.fields {
        syn::Fields::Named(named) => named.named.iter().map(|f| &f.ty).collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    let name = &sut.ident;
    let output = quote::quote! {
        impl StructUnpack for #name {
            fn unpack(reader: &mut GmkStream, version: GmkVersion) -> Result<Self> {
                #(let #fields = <#types as StructUnpack>::unpack(reader, version)?;)*
                Ok(Self { #(#fields),* })
            }
        }
    };
    output.into()
}
