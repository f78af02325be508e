use darling::{ast::Data, FromDeriveInput};
use easy_ext::ext;
use itertools::Itertools as _;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    parse_quote,
    punctuated::Punctuated,
    token::{Comma, Where},
    Error, Expr, Generics, Ident, ImplItemFn, Member, Path, WhereClause, WherePredicate,
};

use crate::{crate_path, ssz_field::SszField};

#[derive(FromDeriveInput)]
// Shapes are validated in `SszType::all_fields` to produce more specific error messages than
// `#[darling(supports(…))]` does.
#[darling(attributes(ssz))]
pub struct SszType {
    ident: Ident,
    generics: Generics,
    data: Data<(), SszField>,

    // Replaces the where clause of every generated impl.
    bound: Option<Punctuated<WherePredicate, Comma>>,
    // Newtype structs marked with this are encoded and hashed exactly like their only field.
    // Without it they are containers with one field.
    #[darling(default)]
    transparent: bool,
}

impl SszType {
    pub fn impls(&self) -> Result<TokenStream, Error> {
        let ssz = crate_path::crate_path("ssz")?;
        let ident = &self.ident;
        let (impl_generics, ty_generics, _) = self.generics.split_for_impl();
        let where_clause = self.where_clause();

        let size_expr = self.size_expr(&ssz)?;
        let from_ssz_unchecked_fn = self.from_ssz_unchecked_fn(&ssz)?;
        let write_fns = self.write_fns(&ssz)?;
        let hash_items = self.hash_items(&ssz)?;

        Ok(quote! {
            impl #impl_generics #ssz::SszSize for #ident #ty_generics #where_clause {
                const SIZE: #ssz::Size = #size_expr;
            }

            impl #impl_generics #ssz::SszRead for #ident #ty_generics #where_clause {
                #from_ssz_unchecked_fn
            }

            impl #impl_generics #ssz::SszWrite for #ident #ty_generics #where_clause {
                #write_fns
            }

            impl #impl_generics #ssz::SszHash for #ident #ty_generics #where_clause {
                #hash_items
            }
        })
    }

    fn where_clause(&self) -> Option<WhereClause> {
        match &self.bound {
            Some(predicates) => Some(WhereClause {
                where_token: Where::default(),
                predicates: predicates.clone(),
            }),
            None => self.generics.where_clause.clone(),
        }
    }

    fn size_expr(&self, ssz: &Path) -> Result<Expr, Error> {
        if self.transparent {
            let (_, ssz_field) = self.single_unskipped_field()?;
            let size_expr = ssz_field.size_expr(ssz);
            return Ok(parse_quote! { #size_expr });
        }

        let size_exprs = self
            .unskipped_fields()?
            .map(|(_, ssz_field)| ssz_field.size_expr(ssz))
            .collect_vec();

        Ok(parse_quote! {
            #ssz::Size::for_container(&[#(#size_exprs),*])
        })
    }

    #[expect(
        clippy::wrong_self_convention,
        reason = "The name refers to the function whose implementation this generates."
    )]
    fn from_ssz_unchecked_fn(&self, ssz: &Path) -> Result<ImplItemFn, Error> {
        let defaults_for_skipped = self
            .all_fields()?
            .filter(|(_, ssz_field)| ssz_field.skip)
            .map(|(member, ssz_field)| {
                let ty = &ssz_field.ty;
                quote! { #member: <#ty as ::core::default::Default>::default(), }
            })
            .collect_vec();

        if self.transparent {
            let (member, _) = self.single_unskipped_field()?;

            return Ok(parse_quote! {
                #[inline]
                fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, #ssz::ReadError> {
                    ::core::result::Result::Ok(Self {
                        #member: #ssz::SszRead::from_ssz_unchecked(bytes)?,
                        #(#defaults_for_skipped)*
                    })
                }
            });
        }

        let fields = self.unskipped_fields()?.collect_vec();

        // Record where each field starts. Fixed-size fields start in the fixed part.
        // Variable-size fields start at the offset stored in the fixed part.
        let fixed_part_stmts = fields.iter().map(|(member, ssz_field)| {
            let size_expr = ssz_field.size_expr(ssz);
            let start_ident = member.start_ident();

            quote! {
                let #start_ident = if let #ssz::Size::Variable { .. } = #size_expr {
                    let slot = #ssz::subslice(bytes, position..position + #ssz::BYTES_PER_LENGTH_OFFSET)?;
                    #ssz::read_offset_unchecked(slot)?
                } else {
                    position
                };

                let position = position + #size_expr.fixed_part();
            }
        });

        // Each variable-size field ends where the next one starts.
        // Walking backwards lets every field see the start of the one after it.
        let decode_stmts = fields.iter().rev().map(|(member, ssz_field)| {
            let size_expr = ssz_field.size_expr(ssz);
            let start_ident = member.start_ident();
            let value_ident = member.value_ident();

            quote! {
                let (first_variable_start, end) = match #size_expr {
                    #ssz::Size::Fixed { size } => (first_variable_start, #start_ident + size),
                    #ssz::Size::Variable { .. } => (#start_ident, first_variable_start),
                };

                let #value_ident = #ssz::SszRead::from_ssz_unchecked(
                    #ssz::subslice(bytes, #start_ident..end)?,
                )?;
            }
        });

        let members = fields.iter().map(|(member, _)| {
            let value_ident = member.value_ident();
            quote! { #member: #value_ident, }
        });

        Ok(parse_quote! {
            fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, #ssz::ReadError> {
                let position = 0;
                #(#fixed_part_stmts)*

                let first_variable_start = bytes.len();
                #(#decode_stmts)*

                // The variable part must begin right after the fixed part.
                if first_variable_start != position {
                    return ::core::result::Result::Err(#ssz::ReadError::ContainerFirstOffsetMismatch {
                        expected: position,
                        actual: first_variable_start,
                    });
                }

                ::core::result::Result::Ok(Self {
                    #(#members)*
                    #(#defaults_for_skipped)*
                })
            }
        })
    }

    fn write_fns(&self, ssz: &Path) -> Result<TokenStream, Error> {
        if self.transparent {
            let (member, _) = self.single_unskipped_field()?;

            return Ok(quote! {
                #[inline]
                fn write_fixed(&self, bytes: &mut [u8]) {
                    #ssz::SszWrite::write_fixed(&self.#member, bytes);
                }

                #[inline]
                fn write_variable(
                    &self,
                    bytes: &mut ::std::vec::Vec<u8>,
                ) -> ::core::result::Result<(), #ssz::WriteError> {
                    #ssz::SszWrite::write_variable(&self.#member, bytes)
                }
            });
        }

        let fields = self.unskipped_fields()?.collect_vec();

        let write_fixed_stmts = fields.iter().map(|(member, ssz_field)| {
            let size_expr = ssz_field.size_expr(ssz);

            quote! {
                let (field_bytes, bytes) = bytes.split_at_mut(#size_expr.fixed_part());
                #ssz::SszWrite::write_fixed(&self.#member, field_bytes);
            }
        });

        let fixed_part_stmts = fields.iter().map(|(member, ssz_field)| {
            let size_expr = ssz_field.size_expr(ssz);
            let start_ident = member.start_ident();

            quote! {
                let #start_ident = bytes.len();
                bytes.resize(#start_ident + #size_expr.fixed_part(), 0);

                if let #ssz::Size::Fixed { .. } = #size_expr {
                    #ssz::SszWrite::write_fixed(&self.#member, &mut bytes[#start_ident..]);
                }
            }
        });

        let variable_part_stmts = fields.iter().map(|(member, ssz_field)| {
            let size_expr = ssz_field.size_expr(ssz);
            let start_ident = member.start_ident();

            quote! {
                if let #ssz::Size::Variable { .. } = #size_expr {
                    let offset = bytes.len() - length_before;
                    #ssz::write_offset(bytes, #start_ident, offset)?;
                    #ssz::SszWrite::write_variable(&self.#member, bytes)?;
                }
            }
        });

        // Only one of the two functions is ever called for a given type.
        // The other one is still generated to keep the macro simple.
        Ok(quote! {
            fn write_fixed(&self, bytes: &mut [u8]) {
                #(#write_fixed_stmts)*
                let _ = bytes;
            }

            fn write_variable(
                &self,
                bytes: &mut ::std::vec::Vec<u8>,
            ) -> ::core::result::Result<(), #ssz::WriteError> {
                let length_before = bytes.len();
                #(#fixed_part_stmts)*
                #(#variable_part_stmts)*
                ::core::result::Result::Ok(())
            }
        })
    }

    fn hash_items(&self, ssz: &Path) -> Result<TokenStream, Error> {
        if self.transparent {
            let (member, ssz_field) = self.single_unskipped_field()?;
            let ty = &ssz_field.ty;

            return Ok(quote! {
                const PACKING_FACTOR: usize = <#ty as #ssz::SszHash>::PACKING_FACTOR;

                #[inline]
                fn hash_tree_root(&self) -> #ssz::H256 {
                    #ssz::SszHash::hash_tree_root(&self.#member)
                }
            });
        }

        let field_roots = self
            .unskipped_fields()?
            .map(|(member, _)| quote! { #ssz::SszHash::hash_tree_root(&self.#member) })
            .collect_vec();

        // The number of fields is known here, so the depth of the tree can be computed now.
        let depth = field_roots.len().next_power_of_two().trailing_zeros() as usize;

        Ok(quote! {
            fn hash_tree_root(&self) -> #ssz::H256 {
                #ssz::MerkleTree::merkleize_chunks(#depth, [#(#field_roots),*])
            }
        })
    }

    fn single_unskipped_field(&self) -> Result<(Member, &SszField), Error> {
        self.unskipped_fields()?.exactly_one().map_err(|_| {
            Error::new(
                Span::call_site(),
                "struct with transparent attribute must have exactly one unskipped field",
            )
        })
    }

    fn unskipped_fields(&self) -> Result<impl Iterator<Item = (Member, &SszField)>, Error> {
        let mut fields = self.all_fields()?.filter(|(_, ssz_field)| !ssz_field.skip).peekable();

        if fields.peek().is_none() {
            return Err(Error::new(
                Span::call_site(),
                "struct has no unskipped fields",
            ));
        }

        Ok(fields)
    }

    fn all_fields(&self) -> Result<impl Iterator<Item = (Member, &SszField)>, Error> {
        match &self.data {
            Data::Enum(_) => Err(Error::new(
                Span::call_site(),
                "SSZ unions are not supported",
            )),
            Data::Struct(fields) if fields.is_empty() => Err(Error::new(
                Span::call_site(),
                "SSZ containers with no fields are illegal",
            )),
            Data::Struct(fields) => Ok(fields.iter().enumerate().map(|(position, ssz_field)| {
                let member = ssz_field
                    .ident
                    .clone()
                    .map_or_else(|| Member::Unnamed(position.into()), Member::Named);
                (member, ssz_field)
            })),
        }
    }
}

#[ext]
impl Member {
    // `Member` implements `Display`, which makes this work for tuple structs too.
    fn start_ident(&self) -> Ident {
        format_ident!("start_of_{}", self)
    }

    fn value_ident(&self) -> Ident {
        format_ident!("value_of_{}", self)
    }
}
