#[cfg(test)]
mod tests {
    use gox_core::{
        error::HostError,
        module::{HostEnv, Module},
        val::Val,
    };

    use crate::strconv::StrconvModule;

    fn invoke(name: &str, args: &[Val]) -> Result<Vec<Val>, HostError> {
        let module = StrconvModule::new();
        let f = module.exports().into_iter().find(|f| f.name() == name).unwrap();
        let mut out = Vec::new();
        f.invoke(args, &mut HostEnv::new(&mut out))
    }

    #[test]
    fn test_itoa() {
        assert_eq!(invoke("Itoa", &[Val::Int(-42)]).unwrap(), vec![Val::str("-42")]);
    }

    #[test]
    fn test_atoi() {
        assert_eq!(invoke("Atoi", &[Val::str("123")]).unwrap(), vec![Val::Int(123), Val::Nil]);
        assert_eq!(invoke("Atoi", &[Val::str("+7")]).unwrap(), vec![Val::Int(7), Val::Nil]);
        assert_eq!(invoke("Atoi", &[Val::str("-7")]).unwrap(), vec![Val::Int(-7), Val::Nil]);
    }

    #[test]
    fn test_atoi_failure_is_recoverable() {
        match invoke("Atoi", &[Val::str("12a")]) {
            Err(HostError::Failed(err)) => {
                assert_eq!(err.to_string(), "parsing \"12a\": invalid syntax");
            }
            other => panic!("expected a recoverable failure, got {other:?}"),
        }
        assert!(matches!(invoke("Atoi", &[Val::str("+-1")]), Err(HostError::Failed(_))));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(
            invoke("ParseFloat", &[Val::str("3.25"), Val::Int(64)]).unwrap(),
            vec![Val::Float(3.25), Val::Nil]
        );
        assert!(matches!(
            invoke("ParseFloat", &[Val::str("x"), Val::Int(64)]),
            Err(HostError::Failed(_))
        ));
    }

    #[test]
    fn test_format_int_bases() {
        assert_eq!(invoke("FormatInt", &[Val::Int(255), Val::Int(16)]).unwrap(), vec![Val::str("ff")]);
        assert_eq!(invoke("FormatInt", &[Val::Int(-5), Val::Int(2)]).unwrap(), vec![Val::str("-101")]);
        assert_eq!(invoke("FormatInt", &[Val::Int(0), Val::Int(36)]).unwrap(), vec![Val::str("0")]);
        assert!(invoke("FormatInt", &[Val::Int(1), Val::Int(1)]).is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(
            invoke("Quote", &[Val::str("a\"b\n")]).unwrap(),
            vec![Val::str("\"a\\\"b\\n\"")]
        );
    }
}
