//! End-to-end tests compiling the fixture site
//!
//! Covers layouts, component imports, stacks and directives working together
//! through a configuration file and the directory loader.

use quire_core::{Builder, CompileError, CompilerConfig, TemplateFinder};
use std::path::PathBuf;

const ESCAPED_USER: &str =
    "<?php echo htmlspecialchars((string) $user, ENT_QUOTES | ENT_SUBSTITUTE, 'utf-8'); ?>";

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/site")
}

fn config() -> CompilerConfig {
    CompilerConfig::from_file(fixtures_dir().join(".quire.jsonc")).unwrap()
}

fn compile(path: &str) -> Result<String, CompileError> {
    Builder::from_config(config())
        .compile(path)
        .map(|result| result.content())
}

mod pages {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn compiles_home_page() {
        let expected = format!(
            "<html><head><h1>Home</h1>btn-css</head><body>\
             <?php if($user): ?><p>Hello {ESCAPED_USER}</p><?php endif; ?>\
             <button class=\"btn\">Go</button></body></html>"
        );
        assert_eq!(compile("pages/home").unwrap(), expected);
    }

    #[rstest]
    #[case("pages/about")]
    #[case("pages.about")]
    #[case("pages/about.html")]
    fn compiles_about_page_with_layout_defaults(#[case] path: &str) {
        assert_eq!(
            compile(path).unwrap(),
            "<html><head><h1>Site</h1></head><body><p>About</p></body></html>"
        );
    }

    #[test]
    fn compiles_layout_on_its_own() {
        assert_eq!(
            compile("layouts/base").unwrap(),
            "<html><head><h1>Site</h1></head><body></body></html>"
        );
    }

    #[test]
    fn reports_error_inside_child_block() {
        let err = compile("pages/broken").unwrap_err();
        assert!(matches!(err, CompileError::Directive(_)), "{err:?}");

        let location = err.location().unwrap();
        assert_eq!(location.path.as_deref(), Some("pages/broken"));
        assert_eq!((location.line, location.column), (3, 3));
        assert_eq!(location.excerpt.trim(), "@bogus($items)");
    }

    #[test]
    fn rejects_missing_template() {
        let err = compile("pages/missing").unwrap_err();
        assert!(matches!(err, CompileError::Loader(ref e) if e.is_not_found()));
    }
}

mod discovery {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_templates_honoring_exclude() {
        let finder = TemplateFinder::from_config(&config()).unwrap();
        let templates = finder.discover(&[]).unwrap();
        assert_eq!(
            templates,
            vec![
                "components/button",
                "layouts/base",
                "pages/about",
                "pages/home",
            ]
        );
    }

    #[test]
    fn filters_by_pattern() {
        let finder = TemplateFinder::from_config(&config()).unwrap();
        let templates = finder.discover(&["pages/*".to_string()]).unwrap();
        assert_eq!(templates, vec!["pages/about", "pages/home"]);
    }

    #[test]
    fn every_discovered_template_compiles() {
        let finder = TemplateFinder::from_config(&config()).unwrap();
        for path in finder.discover(&[]).unwrap() {
            if let Err(err) = compile(&path) {
                panic!("{path} failed to compile: {err}");
            }
        }
    }
}

mod source_maps {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn maps_lines_of_untrimmed_output() {
        let mut config = config();
        config.trim_whitespace = false;

        let builder = Builder::from_config(config);
        let result = builder.compile("pages/about").unwrap();
        let map = result.source_map(builder.loader());

        assert_eq!(map.lookup(1), Some(("layouts/base", 1)));
        assert!(map.paths().iter().any(|path| path == "pages/about"));
    }
}
